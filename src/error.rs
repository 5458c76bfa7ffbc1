use std::error::Error as StdError;
use std::fmt;

use reqwest::{Method, StatusCode};

/// Broad classification of every failure the SDK can report.
///
/// The first group never leaves the process: the request was rejected before a
/// single byte was signed. `Preflight` and `OnChainRevert` come back from the
/// exchange, and only the latter means a transaction was executed and a nonce
/// was consumed.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum_macros::Display)]
pub enum Kind {
    /// Generic local input error.
    Validation,
    /// Price or quantity not aligned to the market's precision step.
    Precision,
    /// `FractionalPrice` or `MinOrder` failed.
    Constraint,
    /// A 32-byte field had the wrong length.
    MalformedAddress,
    /// More actions than a single batch may carry.
    TooManyActions,
    /// The session expiry has passed.
    SessionExpired,
    /// No session has been established on the handle.
    Session,
    /// Local nonce could not be trusted after a failed submission.
    NonceDesync,
    /// The signing primitive failed or returned an unusable signature.
    Signing,
    /// The exchange rejected the request before submitting a transaction.
    Preflight,
    /// The transaction was submitted and reverted on chain.
    OnChainRevert,
    /// Non-success HTTP status without a structured error body.
    Status,
    /// Transport, JSON or URL plumbing.
    Internal,
}

/// What a caller should do about an error.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// Fix the inputs and resubmit.
    FixInputs,
    /// The trade was attempted; check balances and open orders.
    CheckState,
    /// Establish a new session and resubmit.
    Reauthenticate,
    /// Transient transport failure; retry at the transport layer.
    Retry,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let source = self.source.as_deref()?;
        source.downcast_ref::<E>()
    }

    /// True when the error was produced without contacting the exchange.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            Kind::Validation
                | Kind::Precision
                | Kind::Constraint
                | Kind::MalformedAddress
                | Kind::TooManyActions
                | Kind::SessionExpired
                | Kind::Session
                | Kind::Signing
        )
    }

    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self.kind {
            Kind::Validation
            | Kind::Precision
            | Kind::Constraint
            | Kind::MalformedAddress
            | Kind::TooManyActions
            | Kind::Signing => Disposition::FixInputs,
            Kind::Preflight => match self.downcast_ref::<Preflight>() {
                Some(preflight) if preflight.is_retryable() => Disposition::Retry,
                _ => Disposition::FixInputs,
            },
            Kind::OnChainRevert | Kind::NonceDesync => Disposition::CheckState,
            Kind::SessionExpired | Kind::Session => Disposition::Reauthenticate,
            Kind::Status | Kind::Internal => Disposition::Retry,
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::Session,
            Validation {
                reason: message.into(),
            },
        )
    }

    pub fn signing<S: Into<String>>(message: S) -> Self {
        Signing {
            reason: message.into(),
        }
        .into()
    }

    pub fn malformed_address<S: Into<String>>(field: S, actual: usize) -> Self {
        MalformedAddress {
            field: field.into(),
            expected: 32,
            actual,
        }
        .into()
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::with_source(
            Kind::Internal,
            Validation {
                reason: message.into(),
            },
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

/// One failed order check. Each variant maps to a distinct on-chain revert.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderViolation {
    /// Price is not a multiple of the quote precision step.
    PricePrecision { price: u64, step: u64 },
    /// `(price * quantity) % 10^base_decimals != 0`.
    FractionalPrice { price: u64, quantity: u64 },
    /// `(price * quantity) / 10^base_decimals < min_order`.
    MinOrder { quote_value: u128, min_order: u64 },
}

impl OrderViolation {
    #[must_use]
    pub const fn kind(self) -> Kind {
        match self {
            OrderViolation::PricePrecision { .. } => Kind::Precision,
            OrderViolation::FractionalPrice { .. } | OrderViolation::MinOrder { .. } => {
                Kind::Constraint
            }
        }
    }
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderViolation::PricePrecision { price, step } => {
                write!(f, "PricePrecision: price {price} is not a multiple of {step}")
            }
            OrderViolation::FractionalPrice { price, quantity } => write!(
                f,
                "FractionalPrice: price {price} * quantity {quantity} leaves a fractional quote amount"
            ),
            OrderViolation::MinOrder {
                quote_value,
                min_order,
            } => write!(
                f,
                "MinOrder: quote value {quote_value} is below min_order {min_order}"
            ),
        }
    }
}

impl StdError for OrderViolation {}

impl From<OrderViolation> for Error {
    fn from(err: OrderViolation) -> Self {
        Error::with_source(err.kind(), err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAddress {
    pub field: String,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for MalformedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} must be exactly {} bytes, got {}",
            self.field, self.expected, self.actual
        )
    }
}

impl StdError for MalformedAddress {}

impl From<MalformedAddress> for Error {
    fn from(err: MalformedAddress) -> Self {
        Error::with_source(Kind::MalformedAddress, err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyActions {
    pub count: usize,
    pub max: usize,
}

impl fmt::Display for TooManyActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch carries {} actions, at most {} are allowed",
            self.count, self.max
        )
    }
}

impl StdError for TooManyActions {}

impl From<TooManyActions> for Error {
    fn from(err: TooManyActions) -> Self {
        Error::with_source(Kind::TooManyActions, err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpired {
    pub expiry: u64,
    pub now: u64,
}

impl fmt::Display for SessionExpired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session expired at {} (now {}); establish a new session",
            self.expiry, self.now
        )
    }
}

impl StdError for SessionExpired {}

impl From<SessionExpired> for Error {
    fn from(err: SessionExpired) -> Self {
        Error::with_source(Kind::SessionExpired, err)
    }
}

/// The local nonce was resynchronized (or could not be) after an ambiguous
/// submission. `remote` is the value now held by the session, if the fetch
/// succeeded.
#[non_exhaustive]
#[derive(Debug)]
pub struct NonceDesync {
    pub local: u64,
    pub remote: Option<u64>,
    pub cause: Box<Error>,
}

impl fmt::Display for NonceDesync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote {
            Some(remote) => write!(
                f,
                "nonce resynchronized {} -> {remote} after: {}",
                self.local, self.cause
            ),
            None => write!(
                f,
                "nonce {} is stale and could not be refreshed: {}",
                self.local, self.cause
            ),
        }
    }
}

impl StdError for NonceDesync {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.cause.as_ref())
    }
}

impl From<NonceDesync> for Error {
    fn from(err: NonceDesync) -> Self {
        Error::with_source(Kind::NonceDesync, err)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signing {
    pub reason: String,
}

impl fmt::Display for Signing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signing failed: {}", self.reason)
    }
}

impl StdError for Signing {}

impl From<Signing> for Error {
    fn from(err: Signing) -> Self {
        Error::with_source(Kind::Signing, err)
    }
}

/// Coded rejection returned before any transaction was submitted.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub code: u32,
    pub message: String,
}

impl Preflight {
    #[must_use]
    pub fn new<S: Into<String>>(code: u32, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        self.code == 1003
    }

    /// Internal errors and rate limiting warrant a backoff retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.code, 1000 | 1003)
    }
}

impl fmt::Display for Preflight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rejected ({}): {}", self.code, self.message)
    }
}

impl StdError for Preflight {}

impl From<Preflight> for Error {
    fn from(err: Preflight) -> Self {
        Error::with_source(Kind::Preflight, err)
    }
}

/// A submitted transaction that executed and reverted. Carries no error code.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct OnChainRevert {
    pub message: String,
    pub reason: String,
    pub receipts: Option<serde_json::Value>,
}

impl OnChainRevert {
    #[must_use]
    pub fn new<S: Into<String>, R: Into<String>>(
        message: S,
        reason: R,
        receipts: Option<serde_json::Value>,
    ) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
            receipts,
        }
    }
}

impl fmt::Display for OnChainRevert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reverted: {} (reason: {})", self.message, self.reason)
    }
}

impl StdError for OnChainRevert {}

impl From<OnChainRevert> for Error {
    fn from(err: OnChainRevert) -> Self {
        Error::with_source(Kind::OnChainRevert, err)
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Status {
    pub status_code: StatusCode,
    pub method: Method,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} returned {}: {}",
            self.method, self.path, self.status_code, self.message
        )
    }
}

impl StdError for Status {}

impl From<Status> for Error {
    fn from(err: Status) -> Self {
        Error::with_source(Kind::Status, err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(Kind::Internal, err)
    }
}

impl From<alloy::signers::Error> for Error {
    fn from(err: alloy::signers::Error) -> Self {
        Error::with_source(Kind::Signing, err)
    }
}
