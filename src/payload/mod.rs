//! The three payloads the exchange contracts verify signatures over, and the
//! translation of trading actions into contract calls.
//!
//! Layouts (every integer a big-endian `u64`):
//!
//! ```text
//! session:    nonce ‖ chain_id ‖ sel("set_session") ‖ 1 ‖ 0 ‖ session_address
//!             ‖ expiry ‖ len(contract_ids) ‖ contract_ids…
//! actions:    nonce ‖ len(calls) ‖ call…
//!   call:     contract_id ‖ len(sel(name)) ‖ sel(name) ‖ amount ‖ asset_id ‖ gas
//!             ‖ option(call_data)
//! withdraw:   nonce ‖ chain_id ‖ sel("withdraw") ‖ identity(to) ‖ asset_id ‖ amount
//! ```

use crate::Result;
use crate::codec::{ByteWriter, WORD, encode_identity, function_selector, order_args};
use crate::error::{Error, TooManyActions};
use crate::types::{Action, B256, ChainId, ChainInt, Identity, Market, Side};

/// Upper bound on actions carried by a single signed batch.
pub const MAX_ACTIONS_PER_BATCH: usize = 5;

/// Gas forwarded with every call: unbounded.
pub const GAS_MAX: u64 = u64::MAX;

pub const SET_SESSION: &str = "set_session";
pub const WITHDRAW: &str = "withdraw";
pub const CREATE_ORDER: &str = "create_order";
pub const CANCEL_ORDER: &str = "cancel_order";
pub const SETTLE_BALANCE: &str = "settle_balance";
pub const REGISTER_REFERER: &str = "register_referer";

/// One entry of an action batch.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub contract_id: B256,
    /// Encoded selector, `u64(len) ‖ name`. The batch length-prefixes it again.
    pub function_selector: Vec<u8>,
    pub amount: u64,
    pub asset_id: B256,
    pub gas: u64,
    pub call_data: Option<Vec<u8>>,
}

impl ContractCall {
    #[must_use]
    pub fn new(
        contract_id: B256,
        function: &str,
        amount: u64,
        asset_id: B256,
        call_data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            contract_id,
            function_selector: function_selector(function),
            amount,
            asset_id,
            gas: GAS_MAX,
            call_data,
        }
    }

    /// Translates an action on `market` into the call the batch will carry.
    ///
    /// `accounts_registry_id` is only consulted for `RegisterReferer`.
    pub fn from_action(
        action: &Action,
        market: &Market,
        accounts_registry_id: Option<&B256>,
    ) -> Result<Self> {
        match action {
            Action::CreateOrder {
                side,
                price,
                quantity,
                order_type,
            } => {
                let (amount, asset_id) = locked_funds(*side, *price, *quantity, market)?;
                Ok(Self::new(
                    market.contract_id,
                    CREATE_ORDER,
                    amount,
                    asset_id,
                    Some(order_args(*price, *quantity, order_type)),
                ))
            }
            Action::CancelOrder { order_id } => Ok(Self::new(
                market.contract_id,
                CANCEL_ORDER,
                0,
                B256::ZERO,
                Some(order_id.to_vec()),
            )),
            Action::SettleBalance { to } => Ok(Self::new(
                market.contract_id,
                SETTLE_BALANCE,
                0,
                B256::ZERO,
                Some(encode_identity(to)),
            )),
            Action::RegisterReferer { to } => {
                let registry = accounts_registry_id.ok_or_else(|| {
                    Error::validation("RegisterReferer requires the accounts registry id")
                })?;
                Ok(Self::new(
                    *registry,
                    REGISTER_REFERER,
                    0,
                    B256::ZERO,
                    Some(encode_identity(to)),
                ))
            }
        }
    }

    fn encoded_len(&self) -> usize {
        32 + WORD
            + self.function_selector.len()
            + WORD
            + 32
            + WORD
            + WORD
            + self.call_data.as_ref().map_or(0, |d| WORD + d.len())
    }
}

/// Funds a new order locks: buys lock quote, sells lock base.
fn locked_funds(
    side: Side,
    price: ChainInt,
    quantity: ChainInt,
    market: &Market,
) -> Result<(u64, B256)> {
    match side {
        Side::Buy => {
            let base_unit = 10_u128.checked_pow(market.base.decimals).ok_or_else(|| {
                Error::validation(format!(
                    "base decimals {} out of range",
                    market.base.decimals
                ))
            })?;
            let quote = u128::from(price) * u128::from(quantity) / base_unit;
            let amount = u64::try_from(quote).map_err(|_e| {
                Error::validation(format!("quote amount {quote} for buy order exceeds u64"))
            })?;
            Ok((amount, market.quote.asset_id))
        }
        Side::Sell => Ok((quantity, market.base.asset_id)),
    }
}

/// Bytes the owner signs to delegate `session_address` until `expiry`.
#[must_use]
pub fn session_delegation(
    nonce: u64,
    chain_id: ChainId,
    session_address: &B256,
    contract_ids: &[B256],
    expiry: u64,
) -> Vec<u8> {
    let capacity = 2 * WORD + WORD + SET_SESSION.len() + 2 * WORD + 32 + 2 * WORD
        + 32 * contract_ids.len();
    let mut writer = ByteWriter::with_capacity(capacity);
    writer
        .put_u64(nonce)
        .put_u64(chain_id)
        .put_selector(SET_SESSION)
        .put_u64(1)
        .put_u64(0)
        .put_b256(session_address)
        .put_u64(expiry)
        .put_u64(contract_ids.len() as u64);
    for contract_id in contract_ids {
        writer.put_b256(contract_id);
    }
    writer.finish()
}

/// Bytes the session key signs for a batch of calls.
pub fn action_batch(nonce: u64, calls: &[ContractCall]) -> Result<Vec<u8>> {
    if calls.len() > MAX_ACTIONS_PER_BATCH {
        return Err(TooManyActions {
            count: calls.len(),
            max: MAX_ACTIONS_PER_BATCH,
        }
        .into());
    }
    if calls.is_empty() {
        return Err(Error::validation("an action batch needs at least one call"));
    }

    let capacity = 2 * WORD + calls.iter().map(ContractCall::encoded_len).sum::<usize>();
    let mut writer = ByteWriter::with_capacity(capacity);
    writer.put_u64(nonce).put_u64(calls.len() as u64);
    for call in calls {
        writer
            .put_b256(&call.contract_id)
            .put_sized(&call.function_selector)
            .put_u64(call.amount)
            .put_b256(&call.asset_id)
            .put_u64(call.gas)
            .put_call_data(call.call_data.as_deref());
    }
    Ok(writer.finish())
}

/// Bytes the owner signs to withdraw `amount` of `asset_id` to `to`.
#[must_use]
pub fn withdrawal(
    nonce: u64,
    chain_id: ChainId,
    to: &Identity,
    asset_id: &B256,
    amount: u64,
) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(5 * WORD + WITHDRAW.len() + 64);
    writer
        .put_u64(nonce)
        .put_u64(chain_id)
        .put_selector(WITHDRAW)
        .put_identity(to)
        .put_b256(asset_id)
        .put_u64(amount);
    writer.finish()
}
