#![allow(clippy::unwrap_used, reason = "Do not need additional syntax for setting up tests")]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use o2_client_sdk::error::{Error, Kind, NonceDesync, OnChainRevert, Preflight};
use o2_client_sdk::session::{SessionHandle, SessionState, SessionStatus};
use o2_client_sdk::signing::{LocalKey, OwnerWallet, SessionKey};
use o2_client_sdk::trader::{
    ActionRequest, MarketBatch, OrderRequest, Trader, TradingPolicies, WithdrawalRequest,
};
use o2_client_sdk::transport::{
    ActionBatchRequest, ActionOutcome, SessionReceipt, SessionRequest, Transport, TxReceipt,
    WithdrawRequest,
};
use o2_client_sdk::types::{B256, Market, MarketAsset, MarketsResponse, Side};
use serde_json::json;

const CONTRACT: B256 = B256::repeat_byte(0xc0);
const MARKET: B256 = B256::repeat_byte(0xd0);
const TRADE_ACCOUNT: B256 = B256::repeat_byte(0xac);

#[derive(Debug)]
enum Scripted {
    Success,
    Preflight(u32),
    Revert(&'static str),
    Unreachable,
}

#[derive(Debug, Default)]
struct Recorded {
    remote_nonce: u64,
    fail_fetch: bool,
    revert_delegation: bool,
    outcomes: VecDeque<Scripted>,
    calls: usize,
    batch_nonces: Vec<u64>,
    batch_sizes: Vec<usize>,
    sessions: Vec<SessionRequest>,
    withdrawals: Vec<WithdrawRequest>,
}

/// In-memory exchange with an injected submission delay.
#[derive(Debug, Default)]
struct MockTransport {
    delay: Duration,
    state: Mutex<Recorded>,
}

impl MockTransport {
    fn with_nonce(remote_nonce: u64) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().remote_nonce = remote_nonce;
        transport
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script(&self, outcome: Scripted) {
        self.state.lock().unwrap().outcomes.push_back(outcome);
    }

    fn set_remote(&self, nonce: u64, fail_fetch: bool) {
        let mut state = self.state.lock().unwrap();
        state.remote_nonce = nonce;
        state.fail_fetch = fail_fetch;
    }

    fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn batch_nonces(&self) -> Vec<u64> {
        self.state.lock().unwrap().batch_nonces.clone()
    }
}

fn market() -> Market {
    Market::builder()
        .contract_id(CONTRACT)
        .market_id(MARKET)
        .min_order(1)
        .base(
            MarketAsset::builder()
                .symbol("FUEL")
                .asset_id(B256::repeat_byte(0xba))
                .decimals(9)
                .max_precision(3)
                .build(),
        )
        .quote(
            MarketAsset::builder()
                .symbol("USDC")
                .asset_id(B256::repeat_byte(0x9e))
                .decimals(9)
                .max_precision(9)
                .build(),
        )
        .build()
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_markets(&self) -> o2_client_sdk::Result<MarketsResponse> {
        self.state.lock().unwrap().calls += 1;
        Ok(serde_json::from_value(json!({
            "accounts_registry_id": B256::repeat_byte(0xee),
            "chain_id": "0x0",
            "markets": [market()],
        }))?)
    }

    async fn fetch_nonce(&self, trade_account_id: &B256) -> o2_client_sdk::Result<u64> {
        assert_eq!(*trade_account_id, TRADE_ACCOUNT, "queried account");
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.fail_fetch {
            return Err(Error::internal("connection refused"));
        }
        Ok(state.remote_nonce)
    }

    async fn submit_session_delegation(
        &self,
        _owner: &B256,
        request: &SessionRequest,
    ) -> o2_client_sdk::Result<SessionReceipt> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.remote_nonce = request.nonce + 1;
        state.sessions.push(request.clone());
        if state.revert_delegation {
            return Err(OnChainRevert::new("delegation failed", "Revert(1)", None).into());
        }
        Ok(serde_json::from_value(json!({
            "tx_id": "beef",
            "trade_account_id": request.contract_id,
            "contract_ids": request.contract_ids,
            "session_id": request.session_id,
            "session_expiry": request.expiry.to_string(),
        }))?)
    }

    async fn submit_action_batch(
        &self,
        _owner: &B256,
        request: &ActionBatchRequest,
    ) -> o2_client_sdk::Result<ActionOutcome> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            state.batch_nonces.push(request.nonce);
            state
                .batch_sizes
                .push(request.actions.iter().map(|group| group.actions.len()).sum());
            state.outcomes.pop_front().unwrap_or(Scripted::Success)
        };
        tokio::time::sleep(self.delay).await;

        let mut state = self.state.lock().unwrap();
        match outcome {
            Scripted::Success => {
                state.remote_nonce = request.nonce + 1;
                Ok(ActionOutcome::Success {
                    tx_id: format!("0x{:064x}", request.nonce),
                    orders: Vec::new(),
                })
            }
            Scripted::Preflight(code) => Ok(ActionOutcome::Preflight(Preflight::new(
                code,
                "Invalid nonce",
            ))),
            Scripted::Revert(reason) => {
                state.remote_nonce = request.nonce + 1;
                Ok(ActionOutcome::OnChainRevert(OnChainRevert::new(
                    "CreateOrder failed",
                    reason,
                    None,
                )))
            }
            Scripted::Unreachable => {
                state.remote_nonce = request.nonce + 1;
                Err(Error::internal("connection reset by peer"))
            }
        }
    }

    async fn submit_withdrawal(
        &self,
        _owner: &B256,
        request: &WithdrawRequest,
    ) -> o2_client_sdk::Result<TxReceipt> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.remote_nonce = request.nonce + 1;
        state.withdrawals.push(request.clone());
        Ok(TxReceipt::new("0xfeed"))
    }
}

fn trader(transport: MockTransport) -> Trader<MockTransport> {
    let owner = OwnerWallet::fuel(LocalKey::from_bytes(&B256::repeat_byte(0x01)).unwrap());
    Trader::new(transport, owner, TradingPolicies::default()).unwrap()
}

async fn active(trader: &Trader<MockTransport>) -> SessionHandle {
    let handle = SessionHandle::new();
    trader
        .establish_session(&handle, TRADE_ACCOUNT, &[MARKET])
        .await
        .unwrap();
    handle
}

fn buy() -> OrderRequest {
    OrderRequest::new(Side::Buy, "2.5", "4")
}

#[tokio::test]
async fn establishing_a_session_consumes_the_account_nonce() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;

    let state = handle.snapshot().await.unwrap();
    assert_eq!(state.nonce(), 6, "delegation consumed nonce 5");
    assert_eq!(state.contract_ids(), &[CONTRACT], "authorized contracts");
    assert_eq!(state.trade_account_id(), TRADE_ACCOUNT, "account");
    assert_eq!(handle.status().await, SessionStatus::Active, "active");

    let recorded = trader.transport().state.lock().unwrap();
    let request = &recorded.sessions[0];
    assert_eq!(request.nonce, 5, "signed with the fetched nonce");
    assert_eq!(request.contract_ids, vec![CONTRACT], "market contract");
}

#[tokio::test]
async fn concurrent_submissions_never_share_a_nonce() {
    let trader = trader(MockTransport::with_nonce(5).delayed(Duration::from_millis(25)));
    let handle = active(&trader).await;

    let (first, second) = tokio::join!(
        trader.create_order(&handle, &MARKET, buy()),
        trader.create_order(&handle, &MARKET, buy()),
    );
    let mut nonces = vec![first.unwrap().nonce, second.unwrap().nonce];
    nonces.sort_unstable();

    assert_eq!(nonces, vec![6, 7], "serialized nonces");
    assert_eq!(trader.transport().batch_nonces().len(), 2, "two batches");
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 8, "advanced twice");
}

#[tokio::test]
async fn expired_session_fails_before_any_call() {
    let trader = trader(MockTransport::with_nonce(0));
    let handle = SessionHandle::from_state(SessionState::new(
        B256::repeat_byte(0x01),
        TRADE_ACCOUNT,
        SessionKey::generate(),
        vec![CONTRACT],
        1,
        3,
    ));

    let err = trader
        .create_order(&handle, &MARKET, buy())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::SessionExpired, "local expiry check");
    assert_eq!(trader.transport().calls(), 0, "no round trip");
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 3, "nonce untouched");
}

#[tokio::test]
async fn preflight_rejection_resyncs_the_nonce() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader.transport().set_remote(11, false);
    trader.transport().script(Scripted::Preflight(4001));

    let err = trader
        .create_order(&handle, &MARKET, buy())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::Preflight, "kind");
    assert_eq!(
        err.downcast_ref::<Preflight>().map(|p| p.code),
        Some(4001),
        "code kept"
    );
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 11, "resynced");
}

#[tokio::test]
async fn revert_resyncs_and_names_the_contract_error() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader
        .transport()
        .script(Scripted::Revert("Revert(18446744073709486086)"));

    let err = trader
        .create_order(&handle, &MARKET, buy())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::OnChainRevert, "kind");
    let revert = err.downcast_ref::<OnChainRevert>().unwrap();
    assert!(
        revert.reason.contains("OrderCreationError::InvalidHeapPrices"),
        "decoded: {}",
        revert.reason
    );
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 7, "revert consumed nonce 6");
}

#[tokio::test]
async fn unknown_outcome_surfaces_nonce_desync() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader.transport().script(Scripted::Unreachable);

    let err = trader
        .create_order(&handle, &MARKET, buy())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::NonceDesync, "kind");
    let desync = err.downcast_ref::<NonceDesync>().unwrap();
    assert_eq!(desync.local, 6, "signed nonce");
    assert_eq!(desync.remote, Some(7), "fetched nonce");
    assert_eq!(desync.cause.kind(), Kind::Internal, "cause kept");
}

#[tokio::test]
async fn failed_resync_is_repaired_before_the_next_submission() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader.transport().script(Scripted::Unreachable);
    trader.transport().set_remote(6, true);

    let err = trader
        .create_order(&handle, &MARKET, buy())
        .await
        .unwrap_err();
    let desync = err.downcast_ref::<NonceDesync>().unwrap();
    assert_eq!(desync.remote, None, "fetch failed");
    assert!(handle.snapshot().await.unwrap().is_desynced(), "flagged");

    trader.transport().set_remote(30, false);
    let receipt = trader.create_order(&handle, &MARKET, buy()).await.unwrap();
    assert_eq!(receipt.nonce, 30, "signed with the refreshed nonce");
    let state = handle.snapshot().await.unwrap();
    assert!(!state.is_desynced(), "flag cleared");
    assert_eq!(state.nonce(), 31, "advanced");
}

#[tokio::test]
async fn failed_redelegation_resyncs_the_previous_session() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader.transport().state.lock().unwrap().revert_delegation = true;

    let err = trader
        .establish_session(&handle, TRADE_ACCOUNT, &[MARKET])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::OnChainRevert, "delegation error returned");
    assert_eq!(
        trader.transport().state.lock().unwrap().sessions[1].nonce,
        6,
        "re-delegation signed with the fetched nonce"
    );
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 7, "previous session resynced");

    let receipt = trader.create_order(&handle, &MARKET, buy()).await.unwrap();
    assert_eq!(receipt.nonce, 7, "batch signed with the refreshed nonce");
    assert_eq!(trader.transport().batch_nonces(), vec![7], "one batch");
}

#[tokio::test]
async fn oversized_batches_are_rejected_locally() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    let calls_before = trader.transport().calls();

    let cancels = (0..6_u8)
        .map(|i| ActionRequest::CancelOrder {
            order_id: B256::repeat_byte(i),
        })
        .collect();
    let err = trader
        .submit_actions(&handle, &[MarketBatch::new(MARKET, cancels)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Kind::TooManyActions, "kind");

    let settling = MarketBatch::new(MARKET, Vec::new())
        .with_action(buy().with_settle_first(true))
        .with_action(buy().with_settle_first(true))
        .with_action(buy().with_settle_first(true));
    let err = trader.submit_actions(&handle, &[settling]).await.unwrap_err();
    assert_eq!(err.kind(), Kind::TooManyActions, "settle counts");

    assert_eq!(trader.transport().calls(), calls_before, "nothing sent");
    assert_eq!(handle.snapshot().await.unwrap().nonce(), 6, "nonce untouched");
}

#[tokio::test]
async fn cancel_orders_splits_into_batches_of_five() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    let ids: Vec<B256> = (0..7_u8).map(B256::repeat_byte).collect();

    let receipts = trader.cancel_orders(&handle, &MARKET, &ids).await.unwrap();
    assert_eq!(receipts.len(), 2, "two batches");
    assert_eq!(
        trader.transport().state.lock().unwrap().batch_sizes,
        vec![5, 2],
        "chunk sizes"
    );
    assert_eq!(trader.transport().batch_nonces(), vec![6, 7], "consecutive");
}

#[tokio::test]
async fn invalid_orders_fail_before_signing() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;

    let err = trader
        .create_order(&handle, &MARKET, OrderRequest::new(Side::Buy, "-1", "4"))
        .await
        .unwrap_err();
    assert!(err.is_local(), "local: {err}");
    assert!(trader.transport().batch_nonces().is_empty(), "nothing submitted");
}

#[tokio::test]
async fn withdraw_uses_a_fresh_nonce_and_advances_it() {
    let trader = trader(MockTransport::with_nonce(5));
    let handle = active(&trader).await;
    trader.transport().set_remote(9, false);

    let asset = B256::repeat_byte(0x9e);
    let receipt = trader
        .withdraw(&handle, WithdrawalRequest::new(asset, 1_000))
        .await
        .unwrap();
    assert_eq!(receipt.tx_id, "0xfeed", "tx id");

    let recorded = trader.transport().state.lock().unwrap();
    let request = &recorded.withdrawals[0];
    assert_eq!(request.nonce, 9, "fetched nonce");
    assert_eq!(request.amount, 1_000, "amount");
    assert_eq!(request.to.bits(), &trader.owner().address(), "defaults to owner");
    drop(recorded);

    assert_eq!(handle.snapshot().await.unwrap().nonce(), 10, "advanced");
}

#[tokio::test]
async fn operations_need_an_established_session() {
    let trader = trader(MockTransport::with_nonce(0));
    let handle = SessionHandle::new();

    let err = trader.settle_balance(&handle, &MARKET).await.unwrap_err();
    assert_eq!(err.kind(), Kind::Session, "no session");
    assert_eq!(trader.resync_nonce(&handle).await.unwrap_err().kind(), Kind::Session, "resync");
}
