//! Client-side action signing and chain encoding for the O2 on-chain order book.
//!
//! The crate turns trading intent expressed in human units into the exact
//! byte payloads the exchange contracts verify, signs them with the right key
//! and framing, and keeps the per-session nonce consistent across calls.
//!
//! Layers, leaves first:
//! - [`scale`]: human decimals to on-chain integers, order constraint checks
//! - [`codec`]: fixed big-endian primitives (selectors, identities, options, order args)
//! - [`signing`]: message framing, compact signature packing, owner and session keys
//! - [`payload`]: the three canonical signing payloads and action-to-call translation
//! - [`session`]: session state and the per-session serialization handle
//! - [`transport`]: the exchange-facing interface and its HTTP implementation
//! - [`trader`]: orchestration of the full sign-submit-advance cycle
//!
//! ```no_run
//! use o2_client_sdk::session::SessionHandle;
//! use o2_client_sdk::trader::{Network, OrderRequest, Trader, TraderConfig, TradingPolicies};
//! use o2_client_sdk::types::{B256, Side};
//! use o2_client_sdk::signing::WalletKind;
//! use secrecy::SecretString;
//!
//! # async fn run(market_id: B256, trade_account_id: B256) -> o2_client_sdk::Result<()> {
//! let config = TraderConfig::for_network(
//!     Network::Testnet,
//!     SecretString::from("0x...".to_owned()),
//!     WalletKind::Fuel,
//!     TradingPolicies::default(),
//! )?;
//! let trader = Trader::from_config(config)?;
//! let session = SessionHandle::new();
//! trader
//!     .establish_session(&session, trade_account_id, &[market_id])
//!     .await?;
//! trader
//!     .create_order(&session, &market_id, OrderRequest::new(Side::Buy, "1.25", "100"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod payload;
pub mod revert;
pub mod scale;
mod serde_helpers;
pub mod session;
pub mod signing;
pub mod trader;
pub mod transport;
pub mod types;

pub type Result<T> = std::result::Result<T, error::Error>;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Current unix time in seconds, clamped at zero for clocks set before 1970.
#[must_use]
pub fn now_unix() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
