use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::framing::Framing;
use super::packer::CompactSignature;
use super::signer::{DigestSigner, LocalKey};
use crate::Result;
use crate::error::Error;
use crate::types::{B256, b256_from_evm};

/// The kind of wallet that owns a trading account. Decides how owner
/// messages are framed and how the 32-byte owner address is derived.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum WalletKind {
    Fuel,
    Evm,
}

impl WalletKind {
    #[must_use]
    pub const fn framing(self) -> Framing {
        match self {
            Self::Fuel => Framing::FuelPrefixed,
            Self::Evm => Framing::EthereumPrefixed,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "fuel" => Ok(Self::Fuel),
            "evm" | "ethereum" | "eth" => Ok(Self::Evm),
            other => Err(Error::validation(format!(
                "unknown wallet kind {other:?}, expected fuel or evm"
            ))),
        }
    }
}

impl FromStr for WalletKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The account owner's key. Signs session delegations and withdrawals.
#[derive(Clone)]
pub struct OwnerWallet {
    kind: WalletKind,
    address: B256,
    signer: Arc<dyn DigestSigner>,
}

impl OwnerWallet {
    /// A local key used as a Fuel-native owner.
    #[must_use]
    pub fn fuel(key: LocalKey) -> Self {
        Self::from_key(WalletKind::Fuel, key)
    }

    /// A local key used as an EVM owner; the address is left-padded to 32 bytes.
    #[must_use]
    pub fn evm(key: LocalKey) -> Self {
        Self::from_key(WalletKind::Evm, key)
    }

    #[must_use]
    pub fn from_key(kind: WalletKind, key: LocalKey) -> Self {
        let address = match kind {
            WalletKind::Fuel => key.fuel_address(),
            WalletKind::Evm => b256_from_evm(key.evm_address()),
        };
        Self {
            kind,
            address,
            signer: Arc::new(key),
        }
    }

    /// An owner whose key lives elsewhere. `address` must already be the
    /// 32-byte owner identity.
    #[must_use]
    pub fn external(kind: WalletKind, address: B256, signer: Arc<dyn DigestSigner>) -> Self {
        Self {
            kind,
            address,
            signer,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> WalletKind {
        self.kind
    }

    #[must_use]
    pub const fn address(&self) -> B256 {
        self.address
    }

    /// Frames `message` for this wallet kind, signs and packs it.
    pub async fn sign_message(&self, message: &[u8]) -> Result<CompactSignature> {
        let digest = self.kind.framing().digest(message);
        let raw = self.signer.sign_digest(digest).await?;
        CompactSignature::pack(raw)
    }
}

impl fmt::Debug for OwnerWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerWallet")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Ephemeral key authorized by the owner to sign action batches.
///
/// Never persisted. A new one is generated for every session.
#[derive(Clone, Debug)]
pub struct SessionKey {
    key: LocalKey,
    address: B256,
}

impl SessionKey {
    #[must_use]
    pub fn generate() -> Self {
        Self::from_key(LocalKey::random())
    }

    #[must_use]
    pub fn from_key(key: LocalKey) -> Self {
        let address = key.fuel_address();
        Self { key, address }
    }

    #[must_use]
    pub const fn address(&self) -> B256 {
        self.address
    }

    /// Signs an action batch payload: `sha256(payload)`, no prefix.
    pub fn sign_actions(&self, payload: &[u8]) -> Result<CompactSignature> {
        let raw = self.key.sign_digest_sync(&Framing::Raw.digest(payload))?;
        CompactSignature::pack(raw)
    }

    /// Signs an arbitrary message with Fuel personal-message framing.
    pub fn sign_personal_message(&self, message: &[u8]) -> Result<CompactSignature> {
        let raw = self
            .key
            .sign_digest_sync(&Framing::FuelPrefixed.digest(message))?;
        CompactSignature::pack(raw)
    }
}
