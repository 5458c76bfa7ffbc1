use crate::scale::ScaleInput;
use crate::types::{B256, Identity, OrderType, Side};

/// Input values for a single order, in human units unless passed as
/// [`ScaleInput::Chain`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRequest {
    pub side: Side,
    pub price: ScaleInput,
    pub quantity: ScaleInput,
    pub order_type: OrderType<ScaleInput>,
    /// Settle the trading account's balance in the same batch, before the order.
    pub settle_first: bool,
}

impl OrderRequest {
    #[must_use]
    pub fn new<P: Into<ScaleInput>, Q: Into<ScaleInput>>(side: Side, price: P, quantity: Q) -> Self {
        Self {
            side,
            price: price.into(),
            quantity: quantity.into(),
            order_type: OrderType::Spot,
            settle_first: false,
        }
    }

    #[must_use]
    pub fn with_order_type(mut self, order_type: OrderType<ScaleInput>) -> Self {
        self.order_type = order_type;
        self
    }

    #[must_use]
    pub const fn with_settle_first(mut self, settle_first: bool) -> Self {
        self.settle_first = settle_first;
        self
    }
}

/// A trading action before it is resolved against its market.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionRequest {
    CreateOrder(OrderRequest),
    CancelOrder { order_id: B256 },
    /// `None` settles to the session's own trading account.
    SettleBalance { to: Option<Identity> },
    RegisterReferer { to: Identity },
}

impl ActionRequest {
    /// Number of batch entries this request expands into.
    #[must_use]
    pub const fn call_count(&self) -> usize {
        match self {
            ActionRequest::CreateOrder(OrderRequest {
                settle_first: true, ..
            }) => 2,
            _ => 1,
        }
    }
}

impl From<OrderRequest> for ActionRequest {
    fn from(order: OrderRequest) -> Self {
        ActionRequest::CreateOrder(order)
    }
}

/// Actions targeting one market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketBatch {
    pub market_id: B256,
    pub actions: Vec<ActionRequest>,
}

impl MarketBatch {
    #[must_use]
    pub fn new(market_id: B256, actions: Vec<ActionRequest>) -> Self {
        Self { market_id, actions }
    }

    #[must_use]
    pub fn with_action<A: Into<ActionRequest>>(mut self, action: A) -> Self {
        self.actions.push(action.into());
        self
    }
}

/// Owner-signed withdrawal of an amount already in chain units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub asset_id: B256,
    pub amount: u64,
    /// Defaults to the owner's own address.
    pub to: Option<Identity>,
}

impl WithdrawalRequest {
    #[must_use]
    pub const fn new(asset_id: B256, amount: u64) -> Self {
        Self {
            asset_id,
            amount,
            to: None,
        }
    }

    #[must_use]
    pub const fn with_recipient(mut self, to: Identity) -> Self {
        self.to = Some(to);
        self
    }
}

/// Result of an accepted action batch.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct BatchReceipt {
    pub tx_id: String,
    /// Nonce the batch was signed with.
    pub nonce: u64,
    pub orders: Vec<serde_json::Value>,
}
