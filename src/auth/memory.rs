// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory auth provider, for tests and offline demos.

use super::{AuthProvider, SignUpOutcome};
use crate::error::SyncError;
use crate::models::{Session, SessionUser};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

struct Account {
    password: String,
    user: SessionUser,
}

/// Accounts and tokens held in maps.
pub struct MemoryAuthProvider {
    accounts: DashMap<String, Account>,
    access_tokens: DashMap<String, SessionUser>,
    refresh_tokens: DashMap<String, SessionUser>,
    next_id: AtomicU64,
    auto_confirm: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self {
            accounts: DashMap::new(),
            access_tokens: DashMap::new(),
            refresh_tokens: DashMap::new(),
            next_id: AtomicU64::new(1),
            auto_confirm: AtomicBool::new(true),
            fail_sign_out: AtomicBool::new(false),
        }
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; returns its user id.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let id = format!("user-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: SessionUser {
                    id: id.clone(),
                    email: Some(email.to_string()),
                },
            },
        );
        id
    }

    /// When off, sign-up requires email confirmation and returns no session.
    pub fn set_auto_confirm(&self, on: bool) {
        self.auto_confirm.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Mint a session for an existing account without a password check.
    pub fn issue_session(&self, email: &str, ttl: Duration) -> Option<Session> {
        let user = self.accounts.get(email)?.user.clone();
        Some(self.mint(user, ttl))
    }

    fn mint(&self, user: SessionUser, ttl: Duration) -> Session {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("access-{}-{}", user.id, n);
        let refresh_token = format!("refresh-{}-{}", user.id, n);
        self.access_tokens.insert(access_token.clone(), user.clone());
        self.refresh_tokens.insert(refresh_token.clone(), user.clone());
        Session {
            access_token,
            refresh_token,
            expires_at: Utc::now() + ttl,
            user,
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, SyncError> {
        let user = match self.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(SyncError::Auth("Invalid login credentials".into())),
        };
        Ok(self.mint(user, Duration::hours(1)))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SyncError> {
        if self.accounts.contains_key(email) {
            return Err(SyncError::Auth("User already registered".into()));
        }
        self.add_account(email, password);

        if self.auto_confirm.load(Ordering::SeqCst) {
            self.sign_in_with_password(email, password)
                .await
                .map(SignUpOutcome::SignedIn)
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), SyncError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(SyncError::Auth("Mock sign-out failure".into()));
        }
        self.access_tokens.remove(&session.access_token);
        self.refresh_tokens.remove(&session.refresh_token);
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SyncError> {
        let (_, user) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| SyncError::Auth("Invalid Refresh Token: Refresh Token Not Found".into()))?;
        Ok(self.mint(user, Duration::hours(1)))
    }

    async fn user_for_token(&self, access_token: &str) -> Result<SessionUser, SyncError> {
        self.access_tokens
            .get(access_token)
            .map(|u| u.value().clone())
            .ok_or_else(|| SyncError::Auth("invalid JWT".into()))
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "memory://authorize?provider={}&redirect_to={}",
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }
}
