use bon::Builder;
use serde::{Deserialize, Serialize};

use super::{B256, ChainInt};
use crate::Result;
use crate::error::Error;
use crate::scale::{self, ScaleInput, ScaleRole};
use crate::serde_helpers::u64_flexible;

/// Largest decimals value that still fits a `rust_decimal` scale.
const MAX_DECIMALS: u32 = 28;

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct MarketAsset {
    #[builder(into)]
    pub symbol: String,
    #[serde(rename = "asset", alias = "asset_id")]
    pub asset_id: B256,
    /// On-chain decimal places.
    pub decimals: u32,
    /// Decimal places that may be non-zero. Never exceeds `decimals`.
    pub max_precision: u32,
}

/// A trading pair and its on-chain parameters.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct Market {
    pub contract_id: B256,
    pub market_id: B256,
    #[serde(default, deserialize_with = "u64_flexible")]
    #[builder(default)]
    pub maker_fee: u64,
    #[serde(default, deserialize_with = "u64_flexible")]
    #[builder(default)]
    pub taker_fee: u64,
    /// Minimum quote value of an order, in quote chain units.
    #[serde(deserialize_with = "u64_flexible")]
    pub min_order: u64,
    #[serde(default, deserialize_with = "u64_flexible")]
    #[builder(default)]
    pub dust: u64,
    #[serde(default, deserialize_with = "u64_flexible")]
    #[builder(default)]
    pub price_window: u64,
    pub base: MarketAsset,
    pub quote: MarketAsset,
}

impl Market {
    /// `BASE/QUOTE`.
    #[must_use]
    pub fn symbol_pair(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }

    /// Rejects asset definitions the scaling rules cannot honor.
    pub fn validate(&self) -> Result<()> {
        for (side, asset) in [("base", &self.base), ("quote", &self.quote)] {
            if asset.max_precision > asset.decimals {
                return Err(Error::validation(format!(
                    "{side} asset {} has max_precision {} above decimals {}",
                    asset.symbol, asset.max_precision, asset.decimals
                )));
            }
            if asset.decimals > MAX_DECIMALS {
                return Err(Error::validation(format!(
                    "{side} asset {} has {} decimals, at most {MAX_DECIMALS} are supported",
                    asset.symbol, asset.decimals
                )));
            }
        }
        Ok(())
    }

    /// Smallest non-zero price increment, in quote chain units.
    pub fn price_step(&self) -> Result<ChainInt> {
        scale::step(self.quote.decimals, self.quote.max_precision)
    }

    /// Price inputs scale on the quote asset and round down.
    pub fn scale_price(&self, price: &ScaleInput) -> Result<ChainInt> {
        scale::scale(
            price,
            self.quote.decimals,
            self.quote.max_precision,
            ScaleRole::Price,
        )
    }

    /// Quantity inputs scale on the base asset and round up.
    pub fn scale_quantity(&self, quantity: &ScaleInput) -> Result<ChainInt> {
        scale::scale(
            quantity,
            self.base.decimals,
            self.base.max_precision,
            ScaleRole::Quantity,
        )
    }

    pub fn format_price(&self, price: ChainInt) -> Result<rust_decimal::Decimal> {
        scale::format(price, self.quote.decimals)
    }

    pub fn format_quantity(&self, quantity: ChainInt) -> Result<rust_decimal::Decimal> {
        scale::format(quantity, self.base.decimals)
    }

    /// Checks every on-chain order constraint, reporting the first violation.
    pub fn validate_order(&self, price: ChainInt, quantity: ChainInt) -> Result<()> {
        scale::validate_order(price, quantity, self)
    }

    /// Largest quantity not above `quantity` whose quote value is whole.
    pub fn adjust_quantity(&self, price: ChainInt, quantity: ChainInt) -> Result<ChainInt> {
        scale::adjust_quantity(price, quantity, self.base.decimals)
    }
}

/// `GET /v1/markets` body.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub books_registry_id: Option<B256>,
    pub accounts_registry_id: B256,
    #[serde(default)]
    pub trade_account_oracle_id: Option<B256>,
    #[serde(deserialize_with = "u64_flexible")]
    pub chain_id: u64,
    #[serde(default)]
    pub base_asset_id: Option<B256>,
    pub markets: Vec<Market>,
}
