//! Orchestration of the full session lifecycle against the exchange.
//!
//! [`Trader`] ties the lower layers together: it resolves human-unit
//! requests against cached markets, builds and signs payloads, submits them
//! through a [`Transport`](crate::transport::Transport) and applies the nonce
//! rules to the caller's [`SessionHandle`](crate::session::SessionHandle):
//! - accepted: the nonce advances by one
//! - rejected or reverted: the nonce is refetched and the error surfaced
//! - unknown outcome: the nonce is refetched and the error surfaced as
//!   [`NonceDesync`](crate::error::NonceDesync)
//!
//! If the refetch itself fails, the next submission on that session resyncs
//! before signing.

mod client;
mod config;
mod policy;
mod types;

pub use client::Trader;
pub use config::{Network, RawTraderConfig, TraderConfig};
pub use policy::{ExpiryPolicy, FixedOrFetch, FractionalQuantityPolicy, TradingPolicies};
pub use types::{ActionRequest, BatchReceipt, MarketBatch, OrderRequest, WithdrawalRequest};
