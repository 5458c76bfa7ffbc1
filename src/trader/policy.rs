use std::time::Duration;

use crate::error::Error;
use crate::{Result, Timestamp};

/// Policy wrapper for values that can either be fixed up front or fetched
/// from the exchange once and cached.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixedOrFetch<T> {
    Fixed(T),
    FetchAndCache,
}

impl<T: Copy> FixedOrFetch<T> {
    pub(crate) const fn fixed(self) -> Option<T> {
        match self {
            FixedOrFetch::Fixed(value) => Some(value),
            FixedOrFetch::FetchAndCache => None,
        }
    }
}

/// When a new session stops being valid.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Relative to the moment the session is established.
    Ttl(Duration),
    /// Absolute unix timestamp in seconds.
    Until(Timestamp),
}

impl ExpiryPolicy {
    pub(crate) fn resolve(self, now: Timestamp) -> Result<Timestamp> {
        match self {
            ExpiryPolicy::Ttl(ttl) => {
                if ttl.as_secs() == 0 {
                    return Err(Error::validation(
                        "session ttl must be at least one second",
                    ));
                }
                now.checked_add(ttl.as_secs())
                    .ok_or_else(|| Error::validation("session ttl overflows the timestamp range"))
            }
            ExpiryPolicy::Until(expiry) if expiry > now => Ok(expiry),
            ExpiryPolicy::Until(expiry) => Err(Error::validation(format!(
                "session expiry {expiry} is not in the future (now {now})"
            ))),
        }
    }

    fn ensure_supported(self) -> Result<()> {
        match self {
            ExpiryPolicy::Ttl(ttl) if ttl.as_secs() == 0 => Err(Error::validation(
                "session ttl must be at least one second",
            )),
            ExpiryPolicy::Ttl(_) | ExpiryPolicy::Until(_) => Ok(()),
        }
    }
}

/// What to do with an order whose quote value is not a whole number of
/// quote units.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FractionalQuantityPolicy {
    /// Lower the quantity to the largest value with a whole quote value.
    Adjust,
    /// Fail locally with `FractionalPrice`.
    Reject,
}

/// Defaults applied by the trader.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradingPolicies {
    pub chain_id: FixedOrFetch<u64>,
    pub expiry: ExpiryPolicy,
    pub fractional_quantity: FractionalQuantityPolicy,
    /// Ask the exchange to return created orders with each batch.
    pub collect_orders: bool,
}

impl Default for TradingPolicies {
    fn default() -> Self {
        Self {
            chain_id: FixedOrFetch::FetchAndCache,
            expiry: ExpiryPolicy::Ttl(Duration::from_secs(24 * 60 * 60)),
            fractional_quantity: FractionalQuantityPolicy::Adjust,
            collect_orders: false,
        }
    }
}

impl TradingPolicies {
    #[must_use]
    pub const fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = FixedOrFetch::Fixed(chain_id);
        self
    }

    #[must_use]
    pub const fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub const fn with_fractional_quantity(mut self, policy: FractionalQuantityPolicy) -> Self {
        self.fractional_quantity = policy;
        self
    }

    #[must_use]
    pub const fn with_collect_orders(mut self, collect: bool) -> Self {
        self.collect_orders = collect;
        self
    }

    pub(crate) fn validate(self) -> Result<()> {
        self.expiry.ensure_supported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_relative_to_now() {
        let expiry = ExpiryPolicy::Ttl(Duration::from_secs(60))
            .resolve(1_000)
            .expect("resolves");
        assert_eq!(expiry, 1_060, "now + ttl");
    }

    #[test]
    fn past_or_zero_expiry_is_rejected() {
        assert!(ExpiryPolicy::Until(1_000).resolve(1_000).is_err(), "not in future");
        assert!(ExpiryPolicy::Ttl(Duration::ZERO).resolve(1).is_err(), "zero ttl");
        assert!(
            TradingPolicies::default()
                .with_expiry(ExpiryPolicy::Ttl(Duration::from_millis(10)))
                .validate()
                .is_err(),
            "sub-second ttl"
        );
        assert!(TradingPolicies::default().validate().is_ok(), "defaults are valid");
    }

    #[test]
    fn fixed_chain_id_bypasses_fetch() {
        let policies = TradingPolicies::default().with_chain_id(9889);
        assert_eq!(policies.chain_id.fixed(), Some(9889), "fixed");
        assert_eq!(TradingPolicies::default().chain_id.fixed(), None, "fetched");
    }
}
