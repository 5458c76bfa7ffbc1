use alloy::primitives::eip191_hash_message;
use sha2::{Digest as _, Sha256};

use crate::types::B256;

pub const FUEL_MESSAGE_PREFIX: &[u8] = b"\x19Fuel Signed Message:\n";
pub const ETHEREUM_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// How a message is turned into the 32-byte digest that gets signed.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Framing {
    /// `sha256(FUEL_MESSAGE_PREFIX ‖ decimal(len) ‖ message)`, used by Fuel-native owners.
    FuelPrefixed,
    /// `keccak256(ETHEREUM_MESSAGE_PREFIX ‖ decimal(len) ‖ message)`, used by EVM owners.
    EthereumPrefixed,
    /// `sha256(message)`, used by session keys.
    Raw,
}

impl Framing {
    #[must_use]
    pub fn digest(self, message: &[u8]) -> B256 {
        match self {
            Self::FuelPrefixed => {
                let digest = Sha256::new()
                    .chain_update(FUEL_MESSAGE_PREFIX)
                    .chain_update(message.len().to_string().as_bytes())
                    .chain_update(message)
                    .finalize();
                B256::from(<[u8; 32]>::from(digest))
            }
            Self::EthereumPrefixed => eip191_hash_message(message),
            Self::Raw => B256::from(<[u8; 32]>::from(Sha256::digest(message))),
        }
    }
}
