// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync reconciler: keeps the remote row and the local store eventually
//! consistent for the signed-in user.
//!
//! Policy is last writer wins on the whole snapshot:
//! - Bootstrap (once per identity): remote row present → overwrite local;
//!   absent → upload local if it has content, else just record the baseline.
//! - Continuous sync: any local change that makes the snapshot differ from
//!   the synced marker arms a debounce timer; the push reads the snapshot
//!   when the timer fires, so bursts of edits become one write.
//! - At most one operation (bootstrap, push, pull) is in flight per
//!   identity. Local reads and writes are never blocked by it.
//! - The marker only moves after a successful read or write. Failures are
//!   reported in the status and retried by the next trigger, never
//!   automatically.

mod driver;

use crate::auth::{AuthSessionManager, SignUpOutcome};
use crate::error::SyncError;
use crate::models::{
    AuthState, Fingerprint, RemoteRecord, Session, SyncOperation, SyncPhase, SyncStatus,
};
use crate::remote::RemoteReplica;
use crate::store::LocalStore;
use crate::time_utils::now_rfc3339;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default quiet period before local edits are pushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Status messages shown to the user.
pub mod messages {
    pub const CHECKING: &str = "Checking cloud data…";
    pub const READ_FAILED: &str = "Cloud read failed.";
    pub const LOADED: &str = "Cloud data loaded.";
    pub const UPLOADED: &str = "Uploaded existing local data to cloud.";
    pub const NO_CLOUD_DATA_YET: &str = "Signed in. No cloud data yet.";
    pub const SYNCING: &str = "Syncing to cloud…";
    pub const SYNC_FAILED: &str = "Cloud sync failed.";
    pub const AUTO_SYNCED: &str = "Auto-synced changes.";
    pub const MANUAL_SYNCED: &str = "Manual sync complete.";
    pub const PULLING: &str = "Pulling cloud data…";
    pub const NO_CLOUD_DATA: &str = "No cloud data found for this account.";
    pub const RESTORED: &str = "Cloud restore complete.";
    pub const BACKED_UP: &str = "Cloud backup updated.";
    pub const SIGNED_IN: &str = "Signed in. Syncing…";
    pub const SIGN_IN_FAILED: &str = "Sign-in failed.";
    pub const SIGNED_UP: &str = "Account created. Check your email if confirmation is required.";
    pub const SIGN_UP_FAILED: &str = "Sign-up failed.";
    pub const SIGNED_OUT: &str = "Signed out. Local mode active.";
    pub const SIGN_OUT_FAILED: &str = "Sign-out failed.";
    pub const REDIRECTING: &str = "Redirecting to provider…";
    pub const SSO_FAILED: &str = "SSO sign-in failed.";
    pub const SESSION_CHECK_FAILED: &str = "Auth session check failed.";
}

/// What a reconciliation call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncOutcome {
    /// Remote state was applied to the local store.
    Pulled,
    /// Local state was written to the remote row.
    Pushed,
    /// Bootstrap found nothing on either side.
    NoCloudData,
    /// Local snapshot already matches the last synced one; nothing written.
    AlreadySynced,
    AlreadyBootstrapped,
    /// The identity changed while the call was in flight; its result was dropped.
    Superseded,
}

/// Per-identity reconciliation state.
#[derive(Default)]
struct ReconcilerState {
    /// Identity the state below belongs to.
    identity: Option<String>,
    /// Bumped on every identity change; tickets from older epochs are stale.
    epoch: u64,
    bootstrapped_user: Option<String>,
    /// Fingerprint of the last snapshot known to match the remote row.
    marker: Option<Fingerprint>,
    in_flight: Option<SyncOperation>,
    pending_push: Option<JoinHandle<()>>,
    debounce_seq: u64,
}

impl ReconcilerState {
    fn is_bootstrapped_for(&self, user_id: &str) -> bool {
        self.bootstrapped_user.as_deref() == Some(user_id)
    }

    fn cancel_pending_push(&mut self) {
        if let Some(handle) = self.pending_push.take() {
            handle.abort();
        }
    }
}

/// Permission to run one operation, bound to the identity it started for.
struct Ticket {
    epoch: u64,
    op: SyncOperation,
    session: Session,
}

struct ReconcilerInner {
    store: LocalStore,
    remote: Arc<dyn RemoteReplica>,
    auth: AuthSessionManager,
    debounce: Duration,
    state: Mutex<ReconcilerState>,
    status: watch::Sender<SyncStatus>,
}

/// Handle to the reconciler. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SyncReconciler {
    inner: Arc<ReconcilerInner>,
}

impl SyncReconciler {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteReplica>,
        auth: AuthSessionManager,
        debounce: Duration,
    ) -> Self {
        let configured = remote.is_configured() && auth.is_enabled();
        let (status, _) = watch::channel(SyncStatus::initial(configured));
        Self {
            inner: Arc::new(ReconcilerInner {
                store,
                remote,
                auth,
                debounce,
                state: Mutex::new(ReconcilerState::default()),
                status,
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.remote.is_configured() && self.inner.auth.is_enabled()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn auth(&self) -> &AuthSessionManager {
        &self.inner.auth
    }

    /// Whether bootstrap has completed for the current identity.
    pub fn is_bootstrapped(&self) -> bool {
        match self.inner.auth.current_session() {
            Some(session) => self.lock().is_bootstrapped_for(session.user_id()),
            None => false,
        }
    }

    /// Fingerprint of the last snapshot known to match the remote row.
    pub fn synced_fingerprint(&self) -> Option<Fingerprint> {
        self.lock().marker.clone()
    }

    /// Whether the local snapshot differs from the synced marker.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty_locked(&self.lock())
    }

    // ─── Bootstrap ───────────────────────────────────────────────

    /// Run the one-time post-sign-in decision for the current identity.
    ///
    /// Waits for the local store to finish loading first. A failed remote
    /// read leaves the identity un-bootstrapped so a later trigger retries.
    pub async fn bootstrap(&self) -> Result<SyncOutcome, SyncError> {
        if !self.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        self.inner.store.wait_until_loaded().await;

        let session = self.require_session().await?;
        let ticket = {
            let mut state = self.lock();
            if state.is_bootstrapped_for(session.user_id()) {
                return Ok(SyncOutcome::AlreadyBootstrapped);
            }
            self.begin_locked(&mut state, SyncOperation::Bootstrap, session)?
        };

        tracing::info!(user_id = ticket.session.user_id(), "Bootstrapping cloud sync");

        let record = match self.inner.remote.fetch(&ticket.session).await {
            Ok(record) => record,
            Err(e) => {
                self.fail(&ticket, messages::READ_FAILED, &e);
                return Err(e);
            }
        };

        if !self.mark_bootstrapped(&ticket) {
            return Ok(SyncOutcome::Superseded);
        }

        if let Some(record) = record {
            tracing::info!(user_id = ticket.session.user_id(), "Remote data found, replacing local");
            return self.apply_remote(&ticket, record, messages::LOADED).await;
        }

        let local = self.inner.store.snapshot();
        if local.has_content() {
            tracing::info!(user_id = ticket.session.user_id(), "No remote data, uploading local");
            return self.push_with(&ticket, messages::UPLOADED).await;
        }

        tracing::info!(user_id = ticket.session.user_id(), "No data on either side");
        let marker = local.fingerprint();
        let finished = self.finish(&ticket, |state, status| {
            state.marker = Some(marker);
            status.phase = SyncPhase::Idle;
            status.message = messages::NO_CLOUD_DATA_YET.to_string();
            status.error = None;
        });
        if !finished {
            return Ok(SyncOutcome::Superseded);
        }
        self.schedule_push(false);
        Ok(SyncOutcome::NoCloudData)
    }

    // ─── Continuous sync ─────────────────────────────────────────

    /// React to a local store change.
    ///
    /// Once bootstrapped, a dirty snapshot (re)arms the debounce timer. If
    /// the identity is signed in but bootstrap has not succeeded yet, the
    /// change retries bootstrap instead.
    pub fn notify_local_change(&self) {
        self.schedule_push(true);
    }

    fn schedule_push(&self, retry_bootstrap: bool) {
        if !self.is_configured() {
            return;
        }
        let Some(session) = self.inner.auth.current_session() else {
            return;
        };

        let mut state = self.lock();
        if state.in_flight.is_some() {
            // Re-armed when the in-flight operation succeeds.
            return;
        }
        if !state.is_bootstrapped_for(session.user_id()) {
            drop(state);
            if retry_bootstrap {
                self.spawn_bootstrap();
            }
            return;
        }

        state.cancel_pending_push();
        if !self.is_dirty_locked(&state) {
            return;
        }

        state.debounce_seq += 1;
        let seq = state.debounce_seq;
        let this = self.clone();
        let delay = self.inner.debounce;
        tracing::debug!(seq, delay_ms = delay.as_millis() as u64, "Local change, push scheduled");
        state.pending_push = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_debounced(seq).await;
        }));
    }

    async fn fire_debounced(&self, seq: u64) {
        {
            let mut state = self.lock();
            if state.debounce_seq != seq {
                return;
            }
            // Detach rather than abort: this task is the one running, and a
            // token refresh must not be cut off halfway.
            state.pending_push = None;
        }

        let session = match self.require_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(error = %e, "Debounced push skipped");
                return;
            }
        };

        let ticket = {
            let mut state = self.lock();
            if state.debounce_seq != seq {
                // A newer edit armed its own timer.
                return;
            }
            if !state.is_bootstrapped_for(session.user_id()) || !self.is_dirty_locked(&state) {
                return;
            }
            match self.begin_locked(&mut state, SyncOperation::Push, session) {
                Ok(ticket) => ticket,
                Err(_) => return,
            }
        };

        // Failures are already reflected in the status.
        let _ = self.push_with(&ticket, messages::AUTO_SYNCED).await;
    }

    // ─── Manual operations ───────────────────────────────────────

    /// Push the local snapshot now, skipping the debounce. No write happens
    /// if the snapshot already matches the last synced one.
    pub async fn sync_now(&self) -> Result<SyncOutcome, SyncError> {
        let session = self.require_session().await?;
        let ticket = {
            let mut state = self.lock();
            if state.in_flight.is_none()
                && state.is_bootstrapped_for(session.user_id())
                && !self.is_dirty_locked(&state)
            {
                state.cancel_pending_push();
                // Clears an earlier failure whose edit has since been undone.
                self.report(SyncPhase::Synced, messages::MANUAL_SYNCED, None);
                return Ok(SyncOutcome::AlreadySynced);
            }
            self.begin_locked(&mut state, SyncOperation::Push, session)?
        };
        self.push_with(&ticket, messages::MANUAL_SYNCED).await
    }

    /// Replace local state with the remote row ("restore"). Fails with
    /// [`SyncError::NoRemoteData`], leaving local untouched, if there is none.
    pub async fn pull_from_cloud(&self) -> Result<SyncOutcome, SyncError> {
        let session = self.require_session().await?;
        let ticket = {
            let mut state = self.lock();
            self.begin_locked(&mut state, SyncOperation::Pull, session)?
        };

        match self.inner.remote.fetch(&ticket.session).await {
            Err(e) => {
                self.fail(&ticket, messages::READ_FAILED, &e);
                Err(e)
            }
            Ok(None) => {
                self.finish(&ticket, |_, status| {
                    status.phase = SyncPhase::Idle;
                    status.message = messages::NO_CLOUD_DATA.to_string();
                    status.error = None;
                });
                Err(SyncError::NoRemoteData)
            }
            Ok(Some(record)) => self.apply_remote(&ticket, record, messages::RESTORED).await,
        }
    }

    /// Write the local snapshot even if it already matches ("backup now").
    pub async fn push_to_cloud(&self) -> Result<SyncOutcome, SyncError> {
        let session = self.require_session().await?;
        let ticket = {
            let mut state = self.lock();
            self.begin_locked(&mut state, SyncOperation::Push, session)?
        };
        self.push_with(&ticket, messages::BACKED_UP).await
    }

    // ─── Auth wrappers ───────────────────────────────────────────

    /// Resolve the persisted session at startup.
    pub async fn resolve_session(&self) -> Result<(), SyncError> {
        if !self.inner.auth.is_enabled() {
            return Err(SyncError::NotConfigured);
        }
        let result = self.inner.auth.check_existing_session().await;
        if let Err(e) = &result {
            self.report(SyncPhase::Error, messages::SESSION_CHECK_FAILED, Some(e.reason()));
        }
        self.handle_auth_state(&self.inner.auth.state());
        result.map(|_| ())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), SyncError> {
        if !self.inner.auth.is_enabled() {
            return Err(SyncError::NotConfigured);
        }
        match self.inner.auth.sign_in(email, password).await {
            Ok(session) => {
                self.on_signed_in(&session);
                Ok(())
            }
            Err(e) => {
                self.report(SyncPhase::Error, messages::SIGN_IN_FAILED, Some(e.reason()));
                Err(e)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SyncError> {
        if !self.inner.auth.is_enabled() {
            return Err(SyncError::NotConfigured);
        }
        match self.inner.auth.sign_up(email, password).await {
            Ok(SignUpOutcome::SignedIn(session)) => {
                self.on_signed_in(&session);
                Ok(SignUpOutcome::SignedIn(session))
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.report(SyncPhase::Idle, messages::SIGNED_UP, None);
                Ok(SignUpOutcome::ConfirmationRequired)
            }
            Err(e) => {
                self.report(SyncPhase::Error, messages::SIGN_UP_FAILED, Some(e.reason()));
                Err(e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), SyncError> {
        if !self.inner.auth.is_enabled() {
            return Err(SyncError::NotConfigured);
        }
        let result = self.inner.auth.sign_out().await;
        self.handle_auth_state(&self.inner.auth.state());
        if let Err(e) = &result {
            self.report(SyncPhase::Error, messages::SIGN_OUT_FAILED, Some(e.reason()));
        }
        result
    }

    /// Start provider sign-in; returns the URL to redirect the user to.
    pub fn sign_in_with_provider(&self, provider: &str, redirect_to: &str) -> Result<String, SyncError> {
        match self.inner.auth.provider_sign_in_url(provider, redirect_to) {
            Ok(url) => {
                self.report(SyncPhase::Idle, messages::REDIRECTING, None);
                Ok(url)
            }
            Err(SyncError::NotConfigured) => Err(SyncError::NotConfigured),
            Err(e) => {
                self.report(SyncPhase::Error, messages::SSO_FAILED, Some(e.reason()));
                Err(e)
            }
        }
    }

    /// Finish provider sign-in with tokens from the redirect.
    pub async fn complete_provider_sign_in(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> Result<(), SyncError> {
        match self
            .inner
            .auth
            .complete_provider_sign_in(access_token, refresh_token, expires_in)
            .await
        {
            Ok(session) => {
                self.on_signed_in(&session);
                Ok(())
            }
            Err(SyncError::NotConfigured) => Err(SyncError::NotConfigured),
            Err(e) => {
                self.report(SyncPhase::Error, messages::SSO_FAILED, Some(e.reason()));
                Err(e)
            }
        }
    }

    fn on_signed_in(&self, session: &Session) {
        {
            let state = self.lock();
            if state.in_flight.is_none() && !state.is_bootstrapped_for(session.user_id()) {
                self.report(SyncPhase::Syncing, messages::SIGNED_IN, None);
            }
        }
        self.handle_auth_state(&AuthState::Authenticated(session.clone()));
    }

    /// React to an auth state transition.
    ///
    /// A new identity resets all per-identity state (bootstrap flag, marker,
    /// pending push) and starts its bootstrap. Signing out resets too; any
    /// operation still in flight for the old identity is discarded when it
    /// completes.
    pub fn handle_auth_state(&self, auth_state: &AuthState) {
        if !self.is_configured() {
            return;
        }
        match auth_state {
            AuthState::Authenticated(session) => {
                let needs_bootstrap = {
                    let mut state = self.lock();
                    if state.identity.as_deref() != Some(session.user_id()) {
                        tracing::info!(user_id = session.user_id(), "New identity, resetting sync state");
                        self.reset_identity_locked(&mut state, Some(session.user_id().to_string()));
                    }
                    !state.is_bootstrapped_for(session.user_id()) && state.in_flight.is_none()
                };
                if needs_bootstrap {
                    self.spawn_bootstrap();
                }
            }
            AuthState::Anonymous => {
                let mut state = self.lock();
                if state.identity.is_some() {
                    self.reset_identity_locked(&mut state, None);
                    self.report(SyncPhase::Idle, messages::SIGNED_OUT, None);
                }
            }
            AuthState::Unresolved | AuthState::Disabled => {}
        }
    }

    // ─── Internals ───────────────────────────────────────────────

    fn spawn_bootstrap(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.bootstrap().await {
                tracing::debug!(error = %e, "Bootstrap did not complete");
            }
        });
    }

    fn reset_identity_locked(&self, state: &mut ReconcilerState, identity: Option<String>) {
        state.cancel_pending_push();
        state.identity = identity;
        state.epoch += 1;
        state.bootstrapped_user = None;
        state.marker = None;
        state.in_flight = None;
        self.inner.status.send_modify(|status| status.in_flight = None);
    }

    /// The signed-in session with a usable access token.
    ///
    /// Fails without awaiting anything when sync is not configured.
    async fn require_session(&self) -> Result<Session, SyncError> {
        if !self.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        match self.inner.auth.valid_session().await {
            Ok(session) => Ok(session),
            Err(SyncError::NotSignedIn) => Err(SyncError::NotSignedIn),
            Err(e) => {
                // A rejected refresh token signs the user out; transport
                // failures keep the identity and wait for the next trigger.
                let auth_state = self.inner.auth.state();
                if auth_state == AuthState::Anonymous {
                    self.handle_auth_state(&auth_state);
                }
                self.report(SyncPhase::Error, messages::SESSION_CHECK_FAILED, Some(e.reason()));
                Err(e)
            }
        }
    }

    /// Claim the in-flight slot. Caller holds the state lock.
    fn begin_locked(
        &self,
        state: &mut ReconcilerState,
        op: SyncOperation,
        session: Session,
    ) -> Result<Ticket, SyncError> {
        if state.in_flight.is_some() {
            return Err(SyncError::Busy);
        }
        // The session may predate a sign-out that has already reset state.
        if self.inner.auth.state().user_id() != Some(session.user_id()) {
            return Err(SyncError::NotSignedIn);
        }
        if state.identity.as_deref() != Some(session.user_id()) {
            self.reset_identity_locked(state, Some(session.user_id().to_string()));
        }

        state.cancel_pending_push();
        state.in_flight = Some(op);

        let message = match op {
            SyncOperation::Bootstrap => messages::CHECKING,
            SyncOperation::Push => messages::SYNCING,
            SyncOperation::Pull => messages::PULLING,
        };
        self.inner.status.send_modify(|status| {
            status.phase = SyncPhase::Syncing;
            status.message = message.to_string();
            status.error = None;
            status.in_flight = Some(op);
        });

        Ok(Ticket {
            epoch: state.epoch,
            op,
            session,
        })
    }

    /// Release the in-flight slot and apply `update`, unless the ticket is stale.
    fn finish(
        &self,
        ticket: &Ticket,
        update: impl FnOnce(&mut ReconcilerState, &mut SyncStatus),
    ) -> bool {
        let mut state = self.lock();
        if state.epoch != ticket.epoch {
            tracing::debug!(op = ?ticket.op, "Dropping result for a previous identity");
            return false;
        }
        state.in_flight = None;
        state.bootstrapped_user = Some(ticket.session.user_id().to_string());
        self.inner.status.send_modify(|status| {
            status.in_flight = None;
            update(&mut *state, status);
        });
        true
    }

    fn fail(&self, ticket: &Ticket, message: &str, error: &SyncError) {
        tracing::warn!(op = ?ticket.op, user_id = ticket.session.user_id(), error = %error, "{}", message);

        let mut state = self.lock();
        if state.epoch != ticket.epoch {
            return;
        }
        state.in_flight = None;
        self.inner.status.send_modify(|status| {
            status.in_flight = None;
            status.phase = SyncPhase::Error;
            status.message = message.to_string();
            status.error = Some(error.reason());
        });
    }

    fn mark_bootstrapped(&self, ticket: &Ticket) -> bool {
        let mut state = self.lock();
        if state.epoch != ticket.epoch {
            return false;
        }
        state.bootstrapped_user = Some(ticket.session.user_id().to_string());
        true
    }

    /// Overwrite all local documents with the remote row.
    async fn apply_remote(
        &self,
        ticket: &Ticket,
        record: RemoteRecord,
        label: &str,
    ) -> Result<SyncOutcome, SyncError> {
        let marker = record.snapshot.fingerprint();
        let synced_at = record.updated_at.unwrap_or_else(now_rfc3339);

        // Swap under the state lock so a sign-out cannot slip in between the
        // epoch check and the overwrite.
        {
            let state = self.lock();
            if state.epoch != ticket.epoch {
                return Ok(SyncOutcome::Superseded);
            }
            self.inner.store.swap_all(record.snapshot);
        }
        self.inner.store.persist_all().await;

        let finished = self.finish(ticket, |state, status| {
            state.marker = Some(marker);
            status.phase = SyncPhase::Synced;
            status.message = label.to_string();
            status.last_synced_at = Some(synced_at);
            status.error = None;
        });
        if !finished {
            return Ok(SyncOutcome::Superseded);
        }

        tracing::info!(user_id = ticket.session.user_id(), "{}", label);
        self.schedule_push(false);
        Ok(SyncOutcome::Pulled)
    }

    /// Write the current local snapshot to the remote row.
    async fn push_with(&self, ticket: &Ticket, label: &str) -> Result<SyncOutcome, SyncError> {
        // Read at push time, not schedule time, so the latest edits go out.
        let snapshot = self.inner.store.snapshot();
        let marker = snapshot.fingerprint();

        if ticket.op != SyncOperation::Push {
            self.report(SyncPhase::Syncing, messages::SYNCING, None);
        }

        match self.inner.remote.upsert(&ticket.session, &snapshot).await {
            Ok(ack) => {
                let finished = self.finish(ticket, |state, status| {
                    state.marker = Some(marker);
                    status.phase = SyncPhase::Synced;
                    status.message = label.to_string();
                    status.last_synced_at = Some(ack.updated_at);
                    status.error = None;
                });
                if !finished {
                    return Ok(SyncOutcome::Superseded);
                }
                tracing::info!(user_id = ticket.session.user_id(), "{}", label);
                self.schedule_push(false);
                Ok(SyncOutcome::Pushed)
            }
            Err(e) => {
                self.fail(ticket, messages::SYNC_FAILED, &e);
                Err(e)
            }
        }
    }

    fn is_dirty_locked(&self, state: &ReconcilerState) -> bool {
        let current = self.inner.store.snapshot().fingerprint();
        state.marker.as_ref() != Some(&current)
    }

    /// Status update outside an operation's lifecycle (auth results).
    fn report(&self, phase: SyncPhase, message: &str, error: Option<String>) {
        self.inner.status.send_modify(|status| {
            status.phase = phase;
            status.message = message.to_string();
            status.error = error;
        });
    }

    fn lock(&self) -> MutexGuard<'_, ReconcilerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
