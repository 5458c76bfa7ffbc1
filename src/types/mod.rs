//! Domain types shared by every layer.

mod action;
mod identity;
mod market;

pub use action::{Action, OrderType, Side};
pub use alloy::primitives::{Address, B256, U256};
pub use identity::Identity;
pub use market::{Market, MarketAsset, MarketsResponse};
pub use rust_decimal::Decimal;

use crate::Result;
use crate::error::Error;

/// Unsigned 64-bit on-chain fixed-point integer (scaled price or quantity).
pub type ChainInt = u64;

pub type ChainId = u64;

/// Builds a 32-byte value from a slice, rejecting any other length.
pub fn b256_from_slice(field: &str, bytes: &[u8]) -> Result<B256> {
    if bytes.len() != 32 {
        return Err(Error::malformed_address(field, bytes.len()));
    }
    Ok(B256::from_slice(bytes))
}

/// Parses a hex string (with or without `0x`) into exactly 32 bytes.
pub fn parse_b256(field: &str, text: &str) -> Result<B256> {
    let trimmed = text.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = alloy::hex::decode(hex)
        .map_err(|e| Error::validation(format!("{field} is not valid hex: {e}")))?;
    b256_from_slice(field, &bytes)
}

/// Left-pads a 20-byte EVM address with zeros to its 32-byte owner identity.
///
/// This is the only place in the crate where a value is padded to 32 bytes.
#[must_use]
pub fn b256_from_evm(address: Address) -> B256 {
    B256::left_padding_from(address.as_slice())
}
