//! Big-endian encoders for the primitives the exchange contracts decode.
//!
//! Every integer is a `u64` in 8 big-endian bytes. Variable-length values are
//! length-prefixed, enums carry a `u64` discriminant, and nothing is padded or
//! aligned: values are concatenated back to back.

use crate::Result;
use crate::types::{B256, ChainInt, Identity, OrderType};

/// Width of every integer slot.
pub const WORD: usize = 8;

pub const OPTION_NONE: u64 = 0;
pub const OPTION_SOME: u64 = 1;

/// Append-only buffer used to assemble payloads.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn put_b256(&mut self, value: &B256) -> &mut Self {
        self.put_bytes(value.as_slice())
    }

    /// `u64(len) ‖ bytes`.
    pub fn put_sized(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_u64(bytes.len() as u64).put_bytes(bytes)
    }

    pub fn put_selector(&mut self, name: &str) -> &mut Self {
        self.put_sized(name.as_bytes())
    }

    pub fn put_identity(&mut self, identity: &Identity) -> &mut Self {
        self.put_u64(identity.discriminant())
            .put_b256(identity.bits())
    }

    pub fn put_order_args(
        &mut self,
        price: ChainInt,
        quantity: ChainInt,
        order_type: &OrderType,
    ) -> &mut Self {
        self.put_u64(price)
            .put_u64(quantity)
            .put_u64(order_type.discriminant());
        match order_type {
            OrderType::Limit { price, timestamp } => self.put_u64(*price).put_u64(*timestamp),
            OrderType::BoundedMarket {
                max_price,
                min_price,
            } => self.put_u64(*max_price).put_u64(*min_price),
            OrderType::Spot | OrderType::FillOrKill | OrderType::PostOnly | OrderType::Market => {
                self
            }
        }
    }

    /// `u64(0)` or `u64(1) ‖ u64(len) ‖ data`.
    pub fn put_call_data(&mut self, data: Option<&[u8]>) -> &mut Self {
        match data {
            None => self.put_u64(OPTION_NONE),
            Some(bytes) => self.put_u64(OPTION_SOME).put_sized(bytes),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[must_use]
pub fn u64_be(value: u64) -> [u8; WORD] {
    value.to_be_bytes()
}

/// `u64(len(name)) ‖ utf8(name)`.
#[must_use]
pub fn function_selector(name: &str) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(WORD + name.len());
    writer.put_selector(name);
    writer.finish()
}

/// `u64(discriminant) ‖ address`; the address must be exactly 32 bytes.
pub fn identity(discriminant: u64, address: &[u8]) -> Result<Vec<u8>> {
    let identity = Identity::from_parts(discriminant, address)?;
    Ok(encode_identity(&identity))
}

#[must_use]
pub fn encode_identity(identity: &Identity) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(WORD + 32);
    writer.put_identity(identity);
    writer.finish()
}

#[must_use]
pub fn option_none() -> Vec<u8> {
    u64_be(OPTION_NONE).to_vec()
}

/// `u64(1) ‖ data`. The payload itself is not length-prefixed.
#[must_use]
pub fn option_some(data: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(WORD + data.len());
    writer.put_u64(OPTION_SOME).put_bytes(data);
    writer.finish()
}

#[must_use]
pub fn option_call_data(data: Option<&[u8]>) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(2 * WORD + data.map_or(0, <[u8]>::len));
    writer.put_call_data(data);
    writer.finish()
}

/// `u64(price) ‖ u64(quantity) ‖ order type`, tightly packed.
#[must_use]
pub fn order_args(price: ChainInt, quantity: ChainInt, order_type: &OrderType) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(5 * WORD);
    writer.put_order_args(price, quantity, order_type);
    writer.finish()
}
