//! Conversion between human decimal values and on-chain fixed-point integers,
//! plus the order checks the contracts enforce.
//!
//! Scaling is done on the decimal text of the input so no binary floating
//! point ever touches a price or quantity. Prices round down to the quote
//! precision step; quantities round up to the base precision step.

use std::fmt;

use rust_decimal::Decimal;

use crate::Result;
use crate::error::{Error, OrderViolation};
use crate::types::{ChainInt, Market};

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleRole {
    /// Floor to the step.
    Price,
    /// Ceiling to the step.
    Quantity,
}

/// A value as the caller supplies it.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScaleInput {
    /// Human decimal text such as `"1.25"`.
    Text(String),
    /// Exact human decimal.
    Decimal(Decimal),
    /// Already scaled; passed through untouched.
    Chain(ChainInt),
}

impl From<&str> for ScaleInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ScaleInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Decimal> for ScaleInput {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl fmt::Display for ScaleInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Chain(value) => write!(f, "{value} (chain)"),
        }
    }
}

/// `10^(decimals - max_precision)`.
pub fn step(decimals: u32, max_precision: u32) -> Result<ChainInt> {
    let exponent = decimals.checked_sub(max_precision).ok_or_else(|| {
        Error::validation(format!(
            "max_precision {max_precision} exceeds decimals {decimals}"
        ))
    })?;
    10_u64
        .checked_pow(exponent)
        .ok_or_else(|| Error::validation(format!("precision step 10^{exponent} exceeds u64")))
}

fn pow10(exponent: u32) -> Result<u128> {
    10_u128
        .checked_pow(exponent)
        .ok_or_else(|| Error::validation(format!("10^{exponent} exceeds u128")))
}

/// Splits decimal text into its value in units of `10^-decimals` and whether
/// any non-zero digit was dropped past that resolution.
fn to_units(text: &str, decimals: u32) -> Result<(u128, bool)> {
    let text = text.trim();
    let unsigned = text.strip_prefix('+').unwrap_or(text);
    if unsigned.starts_with('-') {
        return Err(Error::validation(format!("{text} is negative")));
    }
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::validation(format!("{text:?} is not a decimal number")));
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(Error::validation(format!("{text:?} is not a decimal number")));
    }

    let resolution = usize::try_from(decimals)
        .map_err(|_e| Error::validation(format!("{decimals} decimals is out of range")))?;
    let (kept, dropped) = if fraction.len() > resolution {
        fraction.split_at(resolution)
    } else {
        (fraction, "")
    };
    let excess = dropped.bytes().any(|b| b != b'0');

    let mut digits = String::with_capacity(whole.len() + resolution);
    digits.push_str(whole);
    digits.push_str(kept);
    for _ in kept.len()..resolution {
        digits.push('0');
    }
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok((0, excess));
    }
    let units = digits
        .parse::<u128>()
        .map_err(|e| Error::validation(format!("{text} is out of range: {e}")))?;
    Ok((units, excess))
}

/// Scales a human value to on-chain units and aligns it to the precision step.
pub fn scale(
    input: &ScaleInput,
    decimals: u32,
    max_precision: u32,
    role: ScaleRole,
) -> Result<ChainInt> {
    let text = match input {
        ScaleInput::Chain(value) => return Ok(*value),
        ScaleInput::Decimal(value) => {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(Error::validation(format!("{value} is negative")));
            }
            value.abs().to_string()
        }
        ScaleInput::Text(text) => text.clone(),
    };

    let step = u128::from(step(decimals, max_precision)?);
    let (units, excess) = to_units(&text, decimals)?;
    let aligned = match role {
        ScaleRole::Price => units / step * step,
        ScaleRole::Quantity => {
            let exact_or_above = units.saturating_add(u128::from(excess));
            exact_or_above
                .div_ceil(step)
                .checked_mul(step)
                .ok_or_else(|| Error::validation(format!("{text} is out of range")))?
        }
    };
    ChainInt::try_from(aligned).map_err(|_e| {
        Error::validation(format!(
            "{text} scaled to {decimals} decimals exceeds the u64 range"
        ))
    })
}

/// Inverse of [`scale`], for display. Exact, never rounds.
pub fn format(value: ChainInt, decimals: u32) -> Result<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(value), decimals)
        .map(|d| d.normalize())
        .map_err(|e| Error::validation(format!("cannot format {value} at {decimals} decimals: {e}")))
}

/// Every constraint the given order violates, in check order.
pub fn order_violations(
    price: ChainInt,
    quantity: ChainInt,
    market: &Market,
) -> Result<Vec<OrderViolation>> {
    let mut violations = Vec::new();

    let step = market.price_step()?;
    if price % step != 0 {
        violations.push(OrderViolation::PricePrecision { price, step });
    }

    let base_unit = pow10(market.base.decimals)?;
    let notional = u128::from(price) * u128::from(quantity);
    if notional % base_unit != 0 {
        violations.push(OrderViolation::FractionalPrice { price, quantity });
    }

    let quote_value = notional / base_unit;
    if quote_value < u128::from(market.min_order) {
        violations.push(OrderViolation::MinOrder {
            quote_value,
            min_order: market.min_order,
        });
    }

    Ok(violations)
}

/// Checks `PricePrecision`, then `FractionalPrice`, then `MinOrder`,
/// reporting the first one violated.
pub fn validate_order(price: ChainInt, quantity: ChainInt, market: &Market) -> Result<()> {
    match order_violations(price, quantity, market)?.into_iter().next() {
        Some(violation) => Err(violation.into()),
        None => Ok(()),
    }
}

/// Largest quantity `<= quantity` for which `price * quantity` is a whole
/// multiple of `10^base_decimals`.
///
/// Valid quantities are exactly the multiples of
/// `10^base_decimals / gcd(price, 10^base_decimals)`.
pub fn adjust_quantity(price: ChainInt, quantity: ChainInt, base_decimals: u32) -> Result<ChainInt> {
    if price == 0 {
        return Err(Error::validation("cannot adjust quantity for a zero price"));
    }
    let base_unit = pow10(base_decimals)?;
    let unit = base_unit / gcd(u128::from(price), base_unit);
    let adjusted = u128::from(quantity) / unit * unit;
    ChainInt::try_from(adjusted)
        .map_err(|_e| Error::internal(format!("adjusted quantity {adjusted} exceeds u64")))
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
