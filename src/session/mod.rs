//! Per-session state and the handle that serializes access to it.
//!
//! A session moves from uninitialized to active when a delegation is accepted
//! and becomes expired once its expiry passes. Every submission holds the
//! handle's lock from nonce read to nonce update, so two callers sharing a
//! session can never sign with the same nonce.

use std::sync::Arc;

use futures::lock::{Mutex, MutexGuard};

use crate::error::{Error, SessionExpired};
use crate::signing::SessionKey;
use crate::types::B256;
use crate::{Result, Timestamp, now_unix};

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum SessionStatus {
    Uninitialized,
    Active,
    Expired,
}

/// An owner-delegated session and its nonce counter.
#[derive(Clone, Debug)]
pub struct SessionState {
    owner_address: B256,
    trade_account_id: B256,
    session_key: SessionKey,
    contract_ids: Vec<B256>,
    expiry: Timestamp,
    nonce: u64,
    desynced: bool,
}

impl SessionState {
    #[must_use]
    pub fn new(
        owner_address: B256,
        trade_account_id: B256,
        session_key: SessionKey,
        contract_ids: Vec<B256>,
        expiry: Timestamp,
        nonce: u64,
    ) -> Self {
        Self {
            owner_address,
            trade_account_id,
            session_key,
            contract_ids,
            expiry,
            nonce,
            desynced: false,
        }
    }

    #[must_use]
    pub const fn owner_address(&self) -> B256 {
        self.owner_address
    }

    #[must_use]
    pub const fn trade_account_id(&self) -> B256 {
        self.trade_account_id
    }

    #[must_use]
    pub fn session_address(&self) -> B256 {
        self.session_key.address()
    }

    #[must_use]
    pub const fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    #[must_use]
    pub fn contract_ids(&self) -> &[B256] {
        &self.contract_ids
    }

    #[must_use]
    pub const fn expiry(&self) -> Timestamp {
        self.expiry
    }

    /// Nonce the next submission will sign with.
    #[must_use]
    pub const fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Set when a resync after a failed submission could not complete. The
    /// next submission must refresh the nonce before signing.
    #[must_use]
    pub const fn is_desynced(&self) -> bool {
        self.desynced
    }

    #[must_use]
    pub fn authorizes(&self, contract_id: &B256) -> bool {
        self.contract_ids.contains(contract_id)
    }

    #[must_use]
    pub const fn status_at(&self, now: Timestamp) -> SessionStatus {
        if now >= self.expiry {
            SessionStatus::Expired
        } else {
            SessionStatus::Active
        }
    }

    pub fn ensure_active_at(&self, now: Timestamp) -> Result<()> {
        match self.status_at(now) {
            SessionStatus::Active => Ok(()),
            SessionStatus::Expired | SessionStatus::Uninitialized => Err(SessionExpired {
                expiry: self.expiry,
                now,
            }
            .into()),
        }
    }

    /// Consumes the current nonce after an accepted submission.
    pub fn advance(&mut self) -> Result<u64> {
        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or_else(|| Error::internal("session nonce overflowed u64"))?;
        Ok(self.nonce)
    }

    /// Replaces the local nonce with the authoritative one.
    pub fn resync(&mut self, remote: u64) {
        self.nonce = remote;
        self.desynced = false;
    }

    pub fn mark_desynced(&mut self) {
        self.desynced = true;
    }
}

/// Shared, lockable slot holding at most one session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone, Debug, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<Option<SessionState>>>,
}

pub type SessionGuard<'guard> = MutexGuard<'guard, Option<SessionState>>;

impl SessionHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_state(state: SessionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// Waits for exclusive access. Hold the guard for the full
    /// read-sign-submit-update cycle.
    pub async fn lock(&self) -> SessionGuard<'_> {
        self.inner.lock().await
    }

    pub async fn status(&self) -> SessionStatus {
        self.status_at(now_unix()).await
    }

    pub async fn status_at(&self, now: Timestamp) -> SessionStatus {
        self.lock()
            .await
            .as_ref()
            .map_or(SessionStatus::Uninitialized, |state| state.status_at(now))
    }

    /// Copy of the current state, if any.
    pub async fn snapshot(&self) -> Option<SessionState> {
        self.lock().await.clone()
    }

    /// Drops the session, returning the handle to uninitialized.
    pub async fn clear(&self) {
        self.lock().await.take();
    }
}

/// Borrows the active state out of a guard, failing on an empty handle.
pub(crate) fn require_state<'state>(
    guard: &'state mut SessionGuard<'_>,
) -> Result<&'state mut SessionState> {
    guard
        .as_mut()
        .ok_or_else(|| Error::session("no session has been established on this handle"))
}
