// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Authenticated session and auth lifecycle state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Backend user id (primary key of the remote row)
    pub id: String,
    pub email: Option<String>,
}

/// Tokens for one signed-in user. Persisted locally so a restart stays signed in.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Auth session manager state.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// No backend configured; every auth operation fails fast.
    Disabled,
    /// Existing session not checked yet.
    Unresolved,
    Anonymous,
    Authenticated(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session().map(Session::user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_in: Duration) -> Session {
        Session {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            expires_at: Utc::now() + expires_in,
            user: SessionUser {
                id: "user-1".into(),
                email: Some("ann@example.com".into()),
            },
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(Duration::hours(1)));
        assert!(rendered.contains("user-1"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_expires_within() {
        assert!(!session(Duration::hours(1)).expires_within(Duration::seconds(60)));
        assert!(session(Duration::seconds(30)).expires_within(Duration::seconds(60)));
    }
}
