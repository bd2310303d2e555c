// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth session manager: owns the current identity and its lifecycle.
//!
//! States: `Disabled` (no backend), `Unresolved` (before the stored session is
//! checked), `Anonymous` and `Authenticated`. Every transition is published on
//! a watch channel; the sync reconciler subscribes to it.

pub mod gotrue;
pub mod memory;

pub use gotrue::GoTrueClient;
pub use memory::MemoryAuthProvider;

use crate::error::SyncError;
use crate::models::{AuthState, Session, SessionUser};
use crate::store::StorageBackend;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Storage key for the persisted session.
pub const SESSION_KEY: &str = "sc3_auth_session";

/// Refresh the access token when it expires within this margin.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Result of a sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Auto-confirmed; the user is signed in.
    SignedIn(Session),
    /// The user must confirm their email before signing in.
    ConfirmationRequired,
}

/// Identity backend operations.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, SyncError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SyncError>;

    /// Revoke the session server-side.
    async fn sign_out(&self, session: &Session) -> Result<(), SyncError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SyncError>;

    /// Look up the user owning an access token (provider sign-in callback).
    async fn user_for_token(&self, access_token: &str) -> Result<SessionUser, SyncError>;

    /// URL that starts provider sign-in and returns to `redirect_to`.
    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String;
}

struct Backend {
    provider: Arc<dyn AuthProvider>,
    storage: Arc<dyn StorageBackend>,
}

struct AuthInner {
    backend: Option<Backend>,
    state: watch::Sender<AuthState>,
    /// Serializes token refresh and sign-out so a refresh token is spent once.
    session_lock: Mutex<()>,
}

/// Handle to the auth lifecycle. Cheap to clone.
#[derive(Clone)]
pub struct AuthSessionManager {
    inner: Arc<AuthInner>,
}

impl AuthSessionManager {
    /// Manager for a configured backend. Starts `Unresolved`; call
    /// [`check_existing_session`](Self::check_existing_session) to resolve.
    pub fn new(provider: Arc<dyn AuthProvider>, storage: Arc<dyn StorageBackend>) -> Self {
        let (state, _) = watch::channel(AuthState::Unresolved);
        Self {
            inner: Arc::new(AuthInner {
                backend: Some(Backend { provider, storage }),
                state,
                session_lock: Mutex::new(()),
            }),
        }
    }

    /// Manager for local-only mode. Stays `Disabled` forever.
    pub fn disabled() -> Self {
        let (state, _) = watch::channel(AuthState::Disabled);
        Self {
            inner: Arc::new(AuthInner {
                backend: None,
                state,
                session_lock: Mutex::new(()),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.backend.is_some()
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.inner.state.borrow().session().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    fn backend(&self) -> Result<&Backend, SyncError> {
        self.inner.backend.as_ref().ok_or(SyncError::NotConfigured)
    }

    /// Resolve the persisted session, refreshing it if it is about to expire.
    pub async fn check_existing_session(&self) -> Result<AuthState, SyncError> {
        let backend = self.backend()?;

        let stored = match backend.storage.get(SESSION_KEY).await {
            Ok(Some(text)) => serde_json::from_str::<Option<Session>>(&text).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Stored session is unreadable, ignoring");
                None
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                None
            }
        };

        let Some(session) = stored else {
            self.set_state(AuthState::Anonymous);
            return Ok(self.state());
        };

        if !session.expires_within(Duration::seconds(TOKEN_REFRESH_MARGIN_SECS)) {
            tracing::info!(user_id = session.user_id(), "Restored existing session");
            self.set_state(AuthState::Authenticated(session));
            return Ok(self.state());
        }

        tracing::info!(user_id = session.user_id(), "Stored session expired, refreshing");
        match backend.provider.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.establish(fresh).await;
                Ok(self.state())
            }
            Err(e) => {
                // A rejected refresh token is final; transport failures keep the
                // stored session so the next start can try again.
                if matches!(e, SyncError::Auth(_)) {
                    self.persist(None).await;
                }
                tracing::warn!(error = %e, "Session refresh failed");
                self.set_state(AuthState::Anonymous);
                Err(e)
            }
        }
    }

    /// The current session, refreshed first if its access token expires
    /// within the refresh margin.
    ///
    /// Concurrent callers share one refresh. The refreshed session keeps the
    /// same identity; it is persisted and published like any other change.
    /// A refresh token the backend rejects signs the user out locally.
    pub async fn valid_session(&self) -> Result<Session, SyncError> {
        let backend = self.backend()?;
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        let session = self.current_session().ok_or(SyncError::NotSignedIn)?;
        if !session.expires_within(margin) {
            return Ok(session);
        }

        let _guard = self.inner.session_lock.lock().await;

        // Another caller may have refreshed while we waited.
        let session = self.current_session().ok_or(SyncError::NotSignedIn)?;
        if !session.expires_within(margin) {
            return Ok(session);
        }

        tracing::info!(user_id = session.user_id(), "Access token expiring, refreshing");
        match backend.provider.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                let replaced = self.inner.state.send_if_modified(|state| match state {
                    AuthState::Authenticated(current)
                        if current.access_token == session.access_token
                            && fresh.user_id() == session.user_id() =>
                    {
                        *state = AuthState::Authenticated(fresh.clone());
                        true
                    }
                    _ => false,
                });
                if !replaced {
                    // Signed in as someone else meanwhile.
                    return self.current_session().ok_or(SyncError::NotSignedIn);
                }
                self.persist(Some(&fresh)).await;
                tracing::debug!(user_id = fresh.user_id(), "Access token refreshed");
                Ok(fresh)
            }
            Err(e) => {
                tracing::warn!(user_id = session.user_id(), error = %e, "Token refresh failed");
                if matches!(e, SyncError::Auth(_)) {
                    self.persist(None).await;
                    self.set_state(AuthState::Anonymous);
                }
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SyncError> {
        let backend = self.backend()?;
        let session = backend.provider.sign_in_with_password(email, password).await?;
        tracing::info!(user_id = session.user_id(), "Signed in");
        self.establish(session.clone()).await;
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SyncError> {
        let backend = self.backend()?;
        let outcome = backend.provider.sign_up(email, password).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            tracing::info!(user_id = session.user_id(), "Signed up and signed in");
            self.establish(session.clone()).await;
        }
        Ok(outcome)
    }

    /// Sign out. Local session state is always cleared; a backend failure is
    /// still returned so it can be reported.
    pub async fn sign_out(&self) -> Result<(), SyncError> {
        let backend = self.backend()?;
        let _guard = self.inner.session_lock.lock().await;
        let Some(session) = self.current_session() else {
            return Ok(());
        };

        let result = backend.provider.sign_out(&session).await;
        self.persist(None).await;
        self.set_state(AuthState::Anonymous);
        tracing::info!(user_id = session.user_id(), ok = result.is_ok(), "Signed out");
        result
    }

    /// URL to redirect the user to for provider (OAuth) sign-in.
    pub fn provider_sign_in_url(&self, provider: &str, redirect_to: &str) -> Result<String, SyncError> {
        let backend = self.backend()?;
        if provider.trim().is_empty() {
            return Err(SyncError::Auth("Missing OAuth provider.".into()));
        }
        Ok(backend.provider.authorize_url(provider, redirect_to))
    }

    /// Finish provider sign-in with the tokens returned on the redirect.
    pub async fn complete_provider_sign_in(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> Result<Session, SyncError> {
        let backend = self.backend()?;
        let user = backend.provider.user_for_token(access_token).await?;
        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
            user,
        };
        tracing::info!(user_id = session.user_id(), "Provider sign-in completed");
        self.establish(session.clone()).await;
        Ok(session)
    }

    async fn establish(&self, session: Session) {
        self.persist(Some(&session)).await;
        self.set_state(AuthState::Authenticated(session));
    }

    async fn persist(&self, session: Option<&Session>) {
        let Ok(backend) = self.backend() else {
            return;
        };
        let text = match serde_json::to_string(&session) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize session");
                return;
            }
        };
        if let Err(e) = backend.storage.set(SESSION_KEY, &text).await {
            tracing::error!(error = %e, "Failed to persist session");
        }
    }

    fn set_state(&self, next: AuthState) {
        tracing::debug!(user_id = next.user_id(), "Auth state changed");
        self.inner.state.send_replace(next);
    }
}
