//! Best-effort decoding of contract revert codes into named error variants.
//!
//! Contracts revert with `0xffff_ffff_ffff_0000 | ordinal` where `ordinal` is
//! the 1-based position of the variant inside its error enum. The enum itself
//! is not encoded, so it is inferred from the surrounding context (which
//! action failed) and otherwise reported as a list of candidates.

use phf::phf_ordered_map;

const SIGNAL_MASK: u64 = 0xffff_ffff_ffff_0000;

static ERROR_ENUMS: phf::OrderedMap<&'static str, &'static [&'static str]> = phf_ordered_map! {
    "contract_schema::blacklist::BlacklistError" => &["TraderAlreadyBlacklisted", "TraderNotBlacklisted"],
    "contract_schema::order_book::FeeError" => &["NoFeesAvailable"],
    "contract_schema::order_book::OrderBookInitializationError" => &[
        "InvalidAsset",
        "InvalidDecimals",
        "InvalidPriceWindow",
        "InvalidPricePrecision",
        "OwnerNotSet",
        "InvalidMinOrder",
    ],
    "contract_schema::order_book::OrderCancelError" => &["NotOrderOwner", "TraderNotBlacklisted", "NoBlacklist"],
    "contract_schema::order_book::OrderCreationError" => &[
        "InvalidOrderArgs",
        "InvalidInputAmount",
        "InvalidAsset",
        "PriceExceedsRange",
        "PricePrecision",
        "InvalidHeapPrices",
        "FractionalPrice",
        "OrderNotFilled",
        "OrderPartiallyFilled",
        "TraderNotWhiteListed",
        "TraderBlackListed",
        "InvalidMarketOrder",
        "InvalidMarketOrderArgs",
    ],
    "contract_schema::register::OrderBookRegistryError" => &["MarketAlreadyHasOrderBook", "InvalidPair"],
    "contract_schema::register::TradeAccountRegistryError" => &[
        "OwnerAlreadyHasTradeAccount",
        "TradeAccountNotRegistered",
        "TradeAccountAlreadyHasReferer",
    ],
    "contract_schema::trade_account::CallerError" => &["InvalidCaller"],
    "contract_schema::trade_account::NonceError" => &["InvalidNonce"],
    "contract_schema::trade_account::SessionError" => &["SessionInThePast", "NoApprovedContractIdsProvided"],
    "contract_schema::trade_account::SignerError" => &["InvalidSigner", "ProxyOwnerIsContract"],
    "contract_schema::trade_account::WithdrawError" => &["AmountIsZero", "NotEnoughBalance"],
    "contract_schema::whitelist::WhitelistError" => &["TraderAlreadyWhitelisted", "TraderNotWhitelisted"],
    "ownership::errors::InitializationError" => &["CannotReinitialized"],
    "pausable::errors::PauseError" => &["Paused", "NotPaused"],
    "src5::AccessError" => &["NotOwner"],
    "std::crypto::signature_error::SignatureError" => &[
        "UnrecoverablePublicKey",
        "InvalidPublicKey",
        "InvalidSignature",
        "InvalidOperation",
    ],
    "upgradability::errors::SetProxyOwnerError" => &["CannotUninitialize"],
};

/// Context keywords, checked in order, and the enum they imply.
const CONTEXT_HINTS: &[(&[&str], &str)] = &[
    (&["CreateOrder"], "contract_schema::order_book::OrderCreationError"),
    (&["CancelOrder"], "contract_schema::order_book::OrderCancelError"),
    (
        &["SettleBalance", "settle_balance"],
        "contract_schema::order_book::OrderCreationError",
    ),
    (&["withdraw", "Withdraw"], "contract_schema::trade_account::WithdrawError"),
    (
        &["register_referer", "RegisterReferer"],
        "contract_schema::register::TradeAccountRegistryError",
    ),
    (&["session", "Session"], "contract_schema::trade_account::SessionError"),
    (&["nonce", "Nonce"], "contract_schema::trade_account::NonceError"),
];

fn infer_enum(context: &str) -> Option<&'static str> {
    CONTEXT_HINTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| context.contains(needle)))
        .map(|(_, name)| *name)
}

fn variant(enum_name: &str, ordinal: usize) -> Option<&'static str> {
    let variants = ERROR_ENUMS.get(enum_name)?;
    variants.get(ordinal.checked_sub(1)?).copied()
}

/// Every `Revert(<decimal>)` code found in `text`, in order.
fn revert_codes(text: &str) -> Vec<u64> {
    text.split("Revert(")
        .skip(1)
        .filter_map(|tail| {
            let end = tail.find(|c: char| !c.is_ascii_digit())?;
            let (digits, rest) = tail.split_at(end);
            if digits.is_empty() || !rest.starts_with(')') {
                return None;
            }
            digits.parse().ok()
        })
        .collect()
}

/// Names the error variant behind a raw revert code, or `None` when the code
/// does not follow the error signal convention.
#[must_use]
pub fn decode_code(raw: u64, context: &str) -> Option<String> {
    if raw & SIGNAL_MASK != SIGNAL_MASK {
        return None;
    }
    let ordinal = usize::from(u16::try_from(raw & 0xffff).ok()?);
    if ordinal == 0 {
        return None;
    }

    if let Some(name) = infer_enum(context)
        && let Some(variant) = variant(name, ordinal)
    {
        return Some(format!("{name}::{variant} (ordinal={ordinal}, raw=0x{raw:016x})"));
    }

    let candidates: Vec<String> = ERROR_ENUMS
        .entries()
        .filter_map(|(name, _)| variant(name, ordinal).map(|v| format!("{name}::{v}")))
        .collect();

    Some(match candidates.as_slice() {
        [] => format!("unknown error ordinal={ordinal} (raw=0x{raw:016x})"),
        [only] => format!("{only} (ordinal={ordinal}, raw=0x{raw:016x})"),
        many => format!(
            "ambiguous error ordinal={ordinal} (raw=0x{raw:016x}); candidates=[{}]",
            many.join(", ")
        ),
    })
}

/// Appends the decoded variant to a revert reason when a code can be found
/// in the message, reason or receipts.
#[must_use]
pub fn augment_reason(message: &str, reason: &str, receipts: Option<&serde_json::Value>) -> String {
    let receipts = receipts.map(ToString::to_string).unwrap_or_default();
    let context = format!("{message}\n{reason}\n{receipts}");

    let decoded = revert_codes(&context)
        .into_iter()
        .find_map(|raw| decode_code(raw, &context));

    #[cfg(feature = "tracing")]
    if let Some(mapped) = &decoded {
        tracing::debug!(%mapped, "decoded revert code");
    }

    match decoded {
        None => reason.to_owned(),
        Some(mapped) if reason.is_empty() => mapped,
        Some(mapped) if reason.contains(&mapped) => reason.to_owned(),
        Some(mapped) => format!("{reason} [{mapped}]"),
    }
}
