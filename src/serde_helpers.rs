//! Representation-agnostic integer decoding for exchange responses.
//!
//! The exchange emits integers as JSON numbers, decimal strings or `0x` hex
//! strings depending on the endpoint. Everything is normalized to `u64` here
//! so nothing past the transport boundary branches on representation.

use std::fmt;
use std::num::ParseIntError;

use serde::Deserializer;
use serde::de::{self, Visitor};

pub(crate) fn parse_u64_text(text: &str) -> Result<u64, ParseIntError> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    }
}

struct FlexibleU64;

impl Visitor<'_> for FlexibleU64 {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a u64 as a number, decimal string or 0x-prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(de::Error::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        parse_u64_text(v).map_err(de::Error::custom)
    }
}

pub(crate) fn u64_flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(FlexibleU64)
}

struct HexPrefixed;

impl Visitor<'_> for HexPrefixed {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        if v.is_empty() || v.starts_with("0x") || v.starts_with("0X") {
            Ok(v.to_owned())
        } else {
            Ok(format!("0x{v}"))
        }
    }
}

/// Transaction ids arrive with or without the `0x` prefix.
pub(crate) fn hex_prefixed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_str(HexPrefixed)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "u64_flexible")]
        nonce: u64,
    }

    #[test]
    fn accepts_every_nonce_representation() {
        for body in [
            r#"{"nonce": 42}"#,
            r#"{"nonce": "42"}"#,
            r#"{"nonce": "0x2a"}"#,
            r#"{"nonce": "0X2A"}"#,
        ] {
            let holder: Holder = serde_json::from_str(body).expect("nonce parses");
            assert_eq!(holder.nonce, 42, "body {body}");
        }
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"nonce": -1}"#).is_err(), "negative");
        assert!(serde_json::from_str::<Holder>(r#"{"nonce": "x1"}"#).is_err(), "garbage");
    }
}
