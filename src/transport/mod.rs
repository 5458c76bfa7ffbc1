//! The exchange-facing boundary.
//!
//! [`Transport`] is the seam between signing logic and the network: the
//! trader only ever talks to it, so tests can script outcomes without HTTP.
//! [`HttpTransport`] is the REST implementation.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as, skip_serializing_none};

pub use http::HttpTransport;

use crate::Result;
use crate::error::{OnChainRevert, Preflight};
use crate::serde_helpers::{hex_prefixed, u64_flexible};
use crate::signing::CompactSignature;
use crate::types::{Action, B256, Identity, MarketsResponse};

/// Header carrying the owner address on owner-scoped calls.
pub const OWNER_ID_HEADER: &str = "O2-Owner-Id";

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_markets(&self) -> Result<MarketsResponse>;

    /// Authoritative nonce of a trading account.
    async fn fetch_nonce(&self, trade_account_id: &B256) -> Result<u64>;

    async fn submit_session_delegation(
        &self,
        owner: &B256,
        request: &SessionRequest,
    ) -> Result<SessionReceipt>;

    /// Submits a signed batch. Exchange-side rejections come back as
    /// [`ActionOutcome`] variants; `Err` means the outcome is unknown.
    async fn submit_action_batch(
        &self,
        owner: &B256,
        request: &ActionBatchRequest,
    ) -> Result<ActionOutcome>;

    async fn submit_withdrawal(&self, owner: &B256, request: &WithdrawRequest)
    -> Result<TxReceipt>;
}

/// Signature envelope the exchange expects: `{"Secp256k1": "0x.."}`.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SignatureEnvelope {
    Secp256k1(CompactSignature),
}

/// `PUT /v1/session` body.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    /// The trading account the session acts for.
    pub contract_id: B256,
    pub session_id: Identity,
    pub signature: SignatureEnvelope,
    pub contract_ids: Vec<B256>,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub expiry: u64,
}

impl SessionRequest {
    #[must_use]
    pub fn new(
        trade_account_id: B256,
        session_address: B256,
        signature: CompactSignature,
        contract_ids: Vec<B256>,
        nonce: u64,
        expiry: u64,
    ) -> Self {
        Self {
            contract_id: trade_account_id,
            session_id: Identity::Address(session_address),
            signature: SignatureEnvelope::Secp256k1(signature),
            contract_ids,
            nonce,
            expiry,
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SessionReceipt {
    #[serde(default, deserialize_with = "hex_prefixed")]
    pub tx_id: String,
    pub trade_account_id: B256,
    pub contract_ids: Vec<B256>,
    pub session_id: Identity,
    #[serde(deserialize_with = "u64_flexible")]
    pub session_expiry: u64,
}

/// Actions grouped under the market they target.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarketActions {
    pub market_id: B256,
    pub actions: Vec<Action>,
}

impl MarketActions {
    #[must_use]
    pub fn new(market_id: B256, actions: Vec<Action>) -> Self {
        Self { market_id, actions }
    }
}

/// `POST /v1/session/actions` body.
#[serde_as]
#[skip_serializing_none]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionBatchRequest {
    pub actions: Vec<MarketActions>,
    pub signature: SignatureEnvelope,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: u64,
    pub trade_account_id: B256,
    pub session_id: Identity,
    pub collect_orders: Option<bool>,
}

impl ActionBatchRequest {
    #[must_use]
    pub fn new(
        actions: Vec<MarketActions>,
        signature: CompactSignature,
        nonce: u64,
        trade_account_id: B256,
        session_address: B256,
    ) -> Self {
        Self {
            actions,
            signature: SignatureEnvelope::Secp256k1(signature),
            nonce,
            trade_account_id,
            session_id: Identity::Address(session_address),
            collect_orders: None,
        }
    }

    #[must_use]
    pub const fn with_collect_orders(mut self, collect: bool) -> Self {
        self.collect_orders = Some(collect);
        self
    }
}

/// How the exchange answered an action batch.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// Executed; the nonce was consumed.
    Success {
        tx_id: String,
        orders: Vec<serde_json::Value>,
    },
    /// Rejected before submission.
    Preflight(Preflight),
    /// Submitted and reverted.
    OnChainRevert(OnChainRevert),
}

/// `POST /v1/accounts/withdraw` body.
#[serde_as]
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WithdrawRequest {
    pub trade_account_id: B256,
    pub signature: SignatureEnvelope,
    #[serde_as(as = "DisplayFromStr")]
    pub nonce: u64,
    pub to: Identity,
    pub asset_id: B256,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u64,
}

impl WithdrawRequest {
    #[must_use]
    pub fn new(
        trade_account_id: B256,
        signature: CompactSignature,
        nonce: u64,
        to: Identity,
        asset_id: B256,
        amount: u64,
    ) -> Self {
        Self {
            trade_account_id,
            signature: SignatureEnvelope::Secp256k1(signature),
            nonce,
            to,
            asset_id,
            amount,
        }
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TxReceipt {
    #[serde(deserialize_with = "hex_prefixed")]
    pub tx_id: String,
}

impl TxReceipt {
    #[must_use]
    pub fn new<S: Into<String>>(tx_id: S) -> Self {
        Self {
            tx_id: tx_id.into(),
        }
    }
}
