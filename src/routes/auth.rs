// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cloud account routes: email/password and provider (OAuth) sign-in.
//!
//! Responses never include tokens; the session stays inside the service.

use crate::auth::SignUpOutcome;
use crate::error::{AppError, Result};
use crate::models::AuthState;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", get(get_session))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/provider/{provider}", get(provider_start))
        .route("/auth/callback", post(provider_callback))
}

/// Current auth state as seen by the UI.
#[derive(Debug, Serialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    /// `disabled`, `unresolved`, `anonymous` or `authenticated`
    pub state: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl From<&AuthState> for SessionResponse {
    fn from(auth: &AuthState) -> Self {
        let state = match auth {
            AuthState::Disabled => "disabled",
            AuthState::Unresolved => "unresolved",
            AuthState::Anonymous => "anonymous",
            AuthState::Authenticated(_) => "authenticated",
        };
        let user = auth.session().map(|s| &s.user);
        SessionResponse {
            state: state.to_string(),
            user_id: user.map(|u| u.id.clone()),
            email: user.and_then(|u| u.email.clone()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignUpResponse {
    pub confirmation_required: bool,
    pub session: SessionResponse,
}

/// Tokens from the provider redirect fragment, forwarded by the UI.
#[derive(Debug, Deserialize, Validate)]
pub struct ProviderCallbackRequest {
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1))]
    pub refresh_token: String,
    #[validate(range(min = 1))]
    pub expires_in: i64,
}

fn validated<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

fn current(state: &AppState) -> Json<SessionResponse> {
    Json(SessionResponse::from(&state.auth.state()))
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    current(&state)
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>> {
    validated(&body)?;
    state.reconciler.sign_in(&body.email, &body.password).await?;
    tracing::info!("Signed in with password");
    Ok(current(&state))
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<SignUpResponse>> {
    validated(&body)?;
    let outcome = state.reconciler.sign_up(&body.email, &body.password).await?;
    Ok(Json(SignUpResponse {
        confirmation_required: outcome == SignUpOutcome::ConfirmationRequired,
        session: SessionResponse::from(&state.auth.state()),
    }))
}

/// Sign out. The local session is cleared even if the backend call fails.
async fn sign_out(State(state): State<Arc<AppState>>) -> Result<Json<SessionResponse>> {
    state.reconciler.sign_out().await?;
    Ok(current(&state))
}

/// Redirect to the provider's authorize page; it returns to FRONTEND_URL.
async fn provider_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let url = state
        .reconciler
        .sign_in_with_provider(&provider, &state.config.frontend_url)?;

    tracing::info!(provider = %provider, "Starting provider sign-in");
    Ok(Redirect::temporary(&url))
}

async fn provider_callback(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProviderCallbackRequest>,
) -> Result<Json<SessionResponse>> {
    validated(&body)?;
    state
        .reconciler
        .complete_provider_sign_in(&body.access_token, &body.refresh_token, body.expires_in)
        .await?;
    Ok(current(&state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        let ok = CredentialsRequest {
            email: "ann@example.com".into(),
            password: "hunter22".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = CredentialsRequest {
            email: "not-an-email".into(),
            password: "hunter22".into(),
        };
        assert!(bad_email.validate().is_err());

        let short = CredentialsRequest {
            email: "ann@example.com".into(),
            password: "12345".into(),
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_session_response_hides_tokens() {
        let response = SessionResponse::from(&AuthState::Anonymous);
        assert_eq!(
            response,
            SessionResponse {
                state: "anonymous".into(),
                user_id: None,
                email: None,
            }
        );
    }
}
