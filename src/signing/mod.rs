//! Message framing, compact signature packing and the keys that sign.
//!
//! Owner wallets sign session delegations and withdrawals with a prefixed
//! framing chosen by [`WalletKind`]; session keys sign action batches over a
//! bare `sha256`. Both produce a 64-byte [`CompactSignature`].

mod framing;
mod packer;
mod signer;
mod wallet;

pub use framing::{ETHEREUM_MESSAGE_PREFIX, FUEL_MESSAGE_PREFIX, Framing};
pub use packer::{CompactSignature, RawSignature};
pub use signer::{DigestSigner, LocalKey};
pub use wallet::{OwnerWallet, SessionKey, WalletKind};
