use std::sync::Arc;

use dashmap::DashMap;
use futures::lock::Mutex;

use crate::error::{Error, NonceDesync, OnChainRevert, TooManyActions};
use crate::payload::{self, ContractCall, MAX_ACTIONS_PER_BATCH};
use crate::revert;
use crate::session::{SessionHandle, SessionState, require_state};
use crate::signing::{LocalKey, OwnerWallet, SessionKey};
use crate::trader::policy::{FractionalQuantityPolicy, TradingPolicies};
use crate::trader::types::{
    ActionRequest, BatchReceipt, MarketBatch, OrderRequest, WithdrawalRequest,
};
use crate::trader::TraderConfig;
use crate::transport::{
    ActionBatchRequest, ActionOutcome, HttpTransport, MarketActions, SessionReceipt,
    SessionRequest, Transport, TxReceipt, WithdrawRequest,
};
use crate::types::{Action, B256, ChainId, Identity, Market};
use crate::{Result, now_unix};

#[derive(Clone, Copy, Debug)]
struct Registry {
    chain_id: ChainId,
    accounts_registry_id: B256,
}

/// Signs and submits trading actions on behalf of one owner wallet.
///
/// Markets are fetched once and shared. Session state lives in
/// [`SessionHandle`]s the caller owns; each operation locks the handle for
/// the whole read-sign-submit-update cycle.
#[derive(Debug)]
pub struct Trader<T: Transport = HttpTransport> {
    transport: T,
    owner: OwnerWallet,
    policies: TradingPolicies,
    markets: DashMap<B256, Arc<Market>>,
    registry: Mutex<Option<Registry>>,
}

impl Trader<HttpTransport> {
    /// Builds a trader backed by the REST transport, using the configured
    /// private key as the owner.
    pub fn from_config(config: TraderConfig) -> Result<Self> {
        let key = LocalKey::from_secret(&config.private_key)?;
        let owner = OwnerWallet::from_key(config.wallet_kind, key);
        Trader::new(HttpTransport::new(config.host), owner, config.policies)
    }
}

impl<T: Transport> Trader<T> {
    pub fn new(transport: T, owner: OwnerWallet, policies: TradingPolicies) -> Result<Self> {
        policies.validate()?;
        Ok(Self {
            transport,
            owner,
            policies,
            markets: DashMap::new(),
            registry: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &OwnerWallet {
        &self.owner
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub const fn policies(&self) -> &TradingPolicies {
        &self.policies
    }

    /// Fetches the market registry and replaces the cached markets.
    pub async fn refresh_markets(&self) -> Result<Vec<Arc<Market>>> {
        let response = self.transport.fetch_markets().await?;
        let chain_id = self.policies.chain_id.fixed().unwrap_or(response.chain_id);

        let mut markets = Vec::with_capacity(response.markets.len());
        for market in response.markets {
            market.validate()?;
            let market = Arc::new(market);
            self.markets.insert(market.market_id, Arc::clone(&market));
            markets.push(market);
        }
        *self.registry.lock().await = Some(Registry {
            chain_id,
            accounts_registry_id: response.accounts_registry_id,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(count = markets.len(), chain_id, "markets refreshed");

        Ok(markets)
    }

    /// Cached market by id, fetching the registry on a miss.
    pub async fn market(&self, market_id: &B256) -> Result<Arc<Market>> {
        if let Some(market) = self.cached_market(market_id) {
            return Ok(market);
        }
        self.refresh_markets().await?;
        self.cached_market(market_id)
            .ok_or_else(|| Error::validation(format!("unknown market {market_id}")))
    }

    /// Cached market by `"BASE/QUOTE"` symbol pair, case-insensitive.
    pub async fn market_by_symbol(&self, pair: &str) -> Result<Arc<Market>> {
        let find = || {
            self.markets
                .iter()
                .find(|entry| entry.value().symbol_pair().eq_ignore_ascii_case(pair))
                .map(|entry| Arc::clone(entry.value()))
        };
        if let Some(market) = find() {
            return Ok(market);
        }
        self.refresh_markets().await?;
        find().ok_or_else(|| Error::validation(format!("unknown market pair {pair}")))
    }

    fn cached_market(&self, market_id: &B256) -> Option<Arc<Market>> {
        self.markets
            .get(market_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    async fn registry(&self) -> Result<Registry> {
        if let Some(registry) = *self.registry.lock().await {
            return Ok(registry);
        }
        self.refresh_markets().await?;
        (*self.registry.lock().await)
            .ok_or_else(|| Error::internal("market registry missing after refresh"))
    }

    /// Chain id from policy, or from the cached market registry.
    pub async fn chain_id(&self) -> Result<ChainId> {
        match self.policies.chain_id.fixed() {
            Some(chain_id) => Ok(chain_id),
            None => Ok(self.registry().await?.chain_id),
        }
    }

    /// Delegates a fresh session key for `market_ids` and stores it in
    /// `handle`, replacing any previous session.
    pub async fn establish_session(
        &self,
        handle: &SessionHandle,
        trade_account_id: B256,
        market_ids: &[B256],
    ) -> Result<SessionReceipt> {
        let expiry = self.policies.expiry.resolve(now_unix())?;

        let mut contract_ids = Vec::with_capacity(market_ids.len());
        for market_id in market_ids {
            let market = self.market(market_id).await?;
            if !contract_ids.contains(&market.contract_id) {
                contract_ids.push(market.contract_id);
            }
        }
        if contract_ids.is_empty() {
            return Err(Error::validation("a session needs at least one market"));
        }
        let chain_id = self.chain_id().await?;

        let mut guard = handle.lock().await;
        let nonce = self.transport.fetch_nonce(&trade_account_id).await?;
        let session_key = SessionKey::generate();
        let session_address = session_key.address();

        let message =
            payload::session_delegation(nonce, chain_id, &session_address, &contract_ids, expiry);
        let signature = self.owner.sign_message(&message).await?;
        let request = SessionRequest::new(
            trade_account_id,
            session_address,
            signature,
            contract_ids,
            nonce,
            expiry,
        );
        let receipt = match self
            .transport
            .submit_session_delegation(&self.owner.address(), &request)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                // The delegation may have consumed the account nonce the
                // previous session was going to sign with.
                if let Some(previous) = guard.as_mut() {
                    self.resync_after_failure(previous).await;
                }
                return Err(err);
            }
        };

        let next_nonce = nonce
            .checked_add(1)
            .ok_or_else(|| Error::internal("account nonce overflowed u64"))?;
        let contract_ids = if receipt.contract_ids.is_empty() {
            request.contract_ids
        } else {
            receipt.contract_ids.clone()
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            owner = %self.owner.address(),
            %trade_account_id,
            contracts = contract_ids.len(),
            expiry = receipt.session_expiry,
            nonce = next_nonce,
            "session established"
        );

        *guard = Some(SessionState::new(
            self.owner.address(),
            trade_account_id,
            session_key,
            contract_ids,
            receipt.session_expiry,
            next_nonce,
        ));
        Ok(receipt)
    }

    /// Signs and submits up to five actions spread across one or more markets
    /// as a single batch.
    pub async fn submit_actions(
        &self,
        handle: &SessionHandle,
        batches: &[MarketBatch],
    ) -> Result<BatchReceipt> {
        let count: usize = batches
            .iter()
            .flat_map(|batch| &batch.actions)
            .map(ActionRequest::call_count)
            .sum();
        if count > MAX_ACTIONS_PER_BATCH {
            return Err(TooManyActions {
                count,
                max: MAX_ACTIONS_PER_BATCH,
            }
            .into());
        }
        if count == 0 {
            return Err(Error::validation("no actions to submit"));
        }

        let mut guard = handle.lock().await;
        let state = require_state(&mut guard)?;
        state.ensure_active_at(now_unix())?;
        if state.is_desynced() {
            self.resync(state).await?;
        }

        let needs_registry = batches
            .iter()
            .flat_map(|batch| &batch.actions)
            .any(|action| matches!(action, ActionRequest::RegisterReferer { .. }));
        let accounts_registry_id = if needs_registry {
            Some(self.registry().await?.accounts_registry_id)
        } else {
            None
        };

        let mut calls = Vec::with_capacity(count);
        let mut groups = Vec::with_capacity(batches.len());
        for batch in batches {
            let market = self.market(&batch.market_id).await?;
            let mut actions = Vec::with_capacity(batch.actions.len());
            for request in &batch.actions {
                self.resolve(request, &market, state, &mut actions)?;
            }
            for action in &actions {
                calls.push(ContractCall::from_action(
                    action,
                    &market,
                    accounts_registry_id.as_ref(),
                )?);
            }
            groups.push(MarketActions::new(market.market_id, actions));
        }

        let nonce = state.nonce();
        let message = payload::action_batch(nonce, &calls)?;
        let signature = state.session_key().sign_actions(&message)?;
        let mut request = ActionBatchRequest::new(
            groups,
            signature,
            nonce,
            state.trade_account_id(),
            state.session_address(),
        );
        if self.policies.collect_orders {
            request = request.with_collect_orders(true);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(nonce, calls = calls.len(), "submitting action batch");

        let outcome = self
            .transport
            .submit_action_batch(&state.owner_address(), &request)
            .await;

        match outcome {
            Ok(ActionOutcome::Success { tx_id, orders }) => {
                state.advance()?;

                #[cfg(feature = "tracing")]
                tracing::debug!(%tx_id, nonce = state.nonce(), "action batch accepted");

                Ok(BatchReceipt {
                    tx_id,
                    nonce,
                    orders,
                })
            }
            Ok(ActionOutcome::Preflight(preflight)) => {
                self.resync_after_failure(state).await;
                Err(preflight.into())
            }
            Ok(ActionOutcome::OnChainRevert(reverted)) => {
                self.resync_after_failure(state).await;
                let reason = revert::augment_reason(
                    &reverted.message,
                    &reverted.reason,
                    reverted.receipts.as_ref(),
                );
                Err(OnChainRevert::new(reverted.message, reason, reverted.receipts).into())
            }
            Err(cause) => {
                let remote = self.resync_after_failure(state).await;
                Err(NonceDesync {
                    local: nonce,
                    remote,
                    cause: Box::new(cause),
                }
                .into())
            }
        }
    }

    /// Turns one request into the chain-unit actions it stands for.
    fn resolve(
        &self,
        request: &ActionRequest,
        market: &Market,
        state: &SessionState,
        actions: &mut Vec<Action>,
    ) -> Result<()> {
        let settle_to = Identity::ContractId(state.trade_account_id());
        match request {
            ActionRequest::CreateOrder(order) => {
                ensure_authorized(state, market)?;
                if order.settle_first {
                    actions.push(Action::SettleBalance { to: settle_to });
                }
                actions.push(self.resolve_order(order, market)?);
            }
            ActionRequest::CancelOrder { order_id } => {
                ensure_authorized(state, market)?;
                actions.push(Action::CancelOrder {
                    order_id: *order_id,
                });
            }
            ActionRequest::SettleBalance { to } => {
                ensure_authorized(state, market)?;
                actions.push(Action::SettleBalance {
                    to: to.unwrap_or(settle_to),
                });
            }
            ActionRequest::RegisterReferer { to } => {
                actions.push(Action::RegisterReferer { to: *to });
            }
        }
        Ok(())
    }

    fn resolve_order(&self, order: &OrderRequest, market: &Market) -> Result<Action> {
        let price = market.scale_price(&order.price)?;
        let mut quantity = market.scale_quantity(&order.quantity)?;
        if self.policies.fractional_quantity == FractionalQuantityPolicy::Adjust {
            quantity = market.adjust_quantity(price, quantity)?;
        }
        market.validate_order(price, quantity)?;
        let order_type = order
            .order_type
            .clone()
            .try_map(|value| market.scale_price(&value))?;

        Ok(Action::CreateOrder {
            side: order.side,
            price,
            quantity,
            order_type,
        })
    }

    pub async fn create_order(
        &self,
        handle: &SessionHandle,
        market_id: &B256,
        order: OrderRequest,
    ) -> Result<BatchReceipt> {
        let batch = MarketBatch::new(*market_id, vec![order.into()]);
        self.submit_actions(handle, &[batch]).await
    }

    pub async fn cancel_order(
        &self,
        handle: &SessionHandle,
        market_id: &B256,
        order_id: B256,
    ) -> Result<BatchReceipt> {
        let batch = MarketBatch::new(*market_id, vec![ActionRequest::CancelOrder { order_id }]);
        self.submit_actions(handle, &[batch]).await
    }

    /// Cancels `order_ids` in consecutive batches of at most five. Stops at
    /// the first failed batch.
    pub async fn cancel_orders(
        &self,
        handle: &SessionHandle,
        market_id: &B256,
        order_ids: &[B256],
    ) -> Result<Vec<BatchReceipt>> {
        let mut receipts = Vec::with_capacity(order_ids.len().div_ceil(MAX_ACTIONS_PER_BATCH));
        for chunk in order_ids.chunks(MAX_ACTIONS_PER_BATCH) {
            let actions = chunk
                .iter()
                .map(|order_id| ActionRequest::CancelOrder {
                    order_id: *order_id,
                })
                .collect();
            let batch = MarketBatch::new(*market_id, actions);
            receipts.push(self.submit_actions(handle, &[batch]).await?);
        }
        Ok(receipts)
    }

    /// Settles filled balances on `market_id` back to the trading account.
    pub async fn settle_balance(
        &self,
        handle: &SessionHandle,
        market_id: &B256,
    ) -> Result<BatchReceipt> {
        let batch = MarketBatch::new(*market_id, vec![ActionRequest::SettleBalance { to: None }]);
        self.submit_actions(handle, &[batch]).await
    }

    pub async fn register_referer(
        &self,
        handle: &SessionHandle,
        market_id: &B256,
        referer: Identity,
    ) -> Result<BatchReceipt> {
        let batch = MarketBatch::new(
            *market_id,
            vec![ActionRequest::RegisterReferer { to: referer }],
        );
        self.submit_actions(handle, &[batch]).await
    }

    /// Withdraws from the session's trading account, signed by the owner.
    ///
    /// Runs under the session lock with a freshly fetched nonce, so it never
    /// races an action batch on the same account.
    pub async fn withdraw(
        &self,
        handle: &SessionHandle,
        request: WithdrawalRequest,
    ) -> Result<TxReceipt> {
        let chain_id = self.chain_id().await?;
        let to = request
            .to
            .unwrap_or(Identity::Address(self.owner.address()));

        let mut guard = handle.lock().await;
        let state = require_state(&mut guard)?;
        self.resync(state).await?;
        let nonce = state.nonce();

        let message = payload::withdrawal(nonce, chain_id, &to, &request.asset_id, request.amount);
        let signature = self.owner.sign_message(&message).await?;
        let body = WithdrawRequest::new(
            state.trade_account_id(),
            signature,
            nonce,
            to,
            request.asset_id,
            request.amount,
        );

        match self
            .transport
            .submit_withdrawal(&self.owner.address(), &body)
            .await
        {
            Ok(receipt) => {
                state.advance()?;
                Ok(receipt)
            }
            Err(err) => {
                self.resync_after_failure(state).await;
                Err(err)
            }
        }
    }

    /// Replaces the session's nonce with the exchange's value.
    pub async fn resync_nonce(&self, handle: &SessionHandle) -> Result<u64> {
        let mut guard = handle.lock().await;
        let state = require_state(&mut guard)?;
        self.resync(state).await
    }

    async fn resync(&self, state: &mut SessionState) -> Result<u64> {
        let remote = self.transport.fetch_nonce(&state.trade_account_id()).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(local = state.nonce(), remote, "nonce resynced");

        state.resync(remote);
        Ok(remote)
    }

    /// Resyncs after a failed submission. A failed fetch leaves the session
    /// flagged so the next submission resyncs first.
    async fn resync_after_failure(&self, state: &mut SessionState) -> Option<u64> {
        match self.resync(state).await {
            Ok(remote) => Some(remote),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(local = state.nonce(), error = %err, "nonce resync failed");
                #[cfg(not(feature = "tracing"))]
                drop(err);

                state.mark_desynced();
                None
            }
        }
    }
}

fn ensure_authorized(state: &SessionState, market: &Market) -> Result<()> {
    if state.authorizes(&market.contract_id) {
        Ok(())
    } else {
        Err(Error::session(format!(
            "market {} ({}) is not covered by this session",
            market.market_id,
            market.symbol_pair()
        )))
    }
}
