use serde::{Deserialize, Serialize};

use super::{B256, b256_from_slice};
use crate::Result;
use crate::error::Error;

/// A 32-byte on-chain identity: an externally-owned address or a contract.
///
/// Serializes as `{"Address": "0x.."}` or `{"ContractId": "0x.."}`.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    Address(B256),
    ContractId(B256),
}

impl Identity {
    pub const ADDRESS_DISCRIMINANT: u64 = 0;
    pub const CONTRACT_ID_DISCRIMINANT: u64 = 1;

    /// Rebuilds an identity from its wire discriminant and raw bytes.
    pub fn from_parts(discriminant: u64, bytes: &[u8]) -> Result<Self> {
        let bits = b256_from_slice("identity", bytes)?;
        match discriminant {
            Self::ADDRESS_DISCRIMINANT => Ok(Self::Address(bits)),
            Self::CONTRACT_ID_DISCRIMINANT => Ok(Self::ContractId(bits)),
            other => Err(Error::validation(format!(
                "identity discriminant must be 0 or 1, got {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn discriminant(&self) -> u64 {
        match self {
            Self::Address(_) => Self::ADDRESS_DISCRIMINANT,
            Self::ContractId(_) => Self::CONTRACT_ID_DISCRIMINANT,
        }
    }

    #[must_use]
    pub const fn bits(&self) -> &B256 {
        match self {
            Self::Address(bits) | Self::ContractId(bits) => bits,
        }
    }
}
