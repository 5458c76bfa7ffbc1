use std::fmt;

use alloy::hex;
use serde::{Serialize, Serializer};

use crate::Result;
use crate::error::Error;
use crate::types::U256;

/// secp256k1 group order `n`.
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Output of a signing primitive before packing.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl RawSignature {
    #[must_use]
    pub const fn new(r: [u8; 32], s: [u8; 32], recovery_id: u8) -> Self {
        Self { r, s, recovery_id }
    }
}

/// 64-byte `r ‖ s'` where the recovery id lives in the top bit of `s'`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompactSignature([u8; 64]);

impl CompactSignature {
    /// Packs a raw signature, normalizing a high `s` to `n - s` first so the
    /// top bit is always free for the recovery id.
    pub fn pack(raw: RawSignature) -> Result<Self> {
        if raw.recovery_id > 1 {
            return Err(Error::signing(format!(
                "recovery id must be 0 or 1, got {}",
                raw.recovery_id
            )));
        }

        let order = U256::from_be_bytes(CURVE_ORDER);
        let s = U256::from_be_bytes(raw.s);
        if s.is_zero() || s >= order {
            return Err(Error::signing("s is outside the curve order"));
        }
        let (s, recovery_id) = if s > order >> 1 {
            #[cfg(feature = "tracing")]
            tracing::debug!(recovery_id = raw.recovery_id, "normalizing high s");
            (order - s, raw.recovery_id ^ 1)
        } else {
            (s, raw.recovery_id)
        };

        let mut packed = [0_u8; 64];
        packed[..32].copy_from_slice(&raw.r);
        packed[32..].copy_from_slice(&s.to_be_bytes::<32>());
        packed[32] = (recovery_id << 7) | (packed[32] & 0x7F);
        Ok(Self(packed))
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    #[must_use]
    pub const fn recovery_id(&self) -> u8 {
        self.0[32] >> 7
    }

    /// Splits back into `r`, low `s` and the recovery id.
    #[must_use]
    pub fn unpack(&self) -> RawSignature {
        let mut r = [0_u8; 32];
        let mut s = [0_u8; 32];
        r.copy_from_slice(&self.0[..32]);
        s.copy_from_slice(&self.0[32..]);
        s[0] &= 0x7F;
        RawSignature::new(r, s, self.recovery_id())
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(self.0)
    }
}

impl fmt::Debug for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompactSignature").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for CompactSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for CompactSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
