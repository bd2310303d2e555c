// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase auth (GoTrue) REST client.

use super::{AuthProvider, SignUpOutcome};
use crate::config::CloudConfig;
use crate::error::SyncError;
use crate::models::{Session, SessionUser};
use crate::remote::postgrest::error_message;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// GoTrue client for password, refresh and provider (OAuth) flows.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
}

impl From<GoTrueUser> for SessionUser {
    fn from(user: GoTrueUser) -> Self {
        SessionUser {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant response (`/token`, and `/signup` when auto-confirm is on).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: GoTrueUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            user: token.user.into(),
        }
    }
}

impl GoTrueClient {
    pub fn new(config: &CloudConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed building auth HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("{}/auth/v1", config.url),
            anon_key: config.anon_key.clone(),
        })
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, SyncError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into())
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, SyncError> {
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, SyncError> {
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        let body: serde_json::Value = check_response_json(response).await?;

        // With email confirmation enabled the body is just the user, no tokens.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| SyncError::Auth(format!("Unexpected sign-up response: {}", e)))?;
            Ok(SignUpOutcome::SignedIn(token.into()))
        } else {
            Ok(SignUpOutcome::ConfirmationRequired)
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), SyncError> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        check_response(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SyncError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn user_for_token(&self, access_token: &str) -> Result<SessionUser, SyncError> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SyncError::Auth(e.to_string()))?;

        let user: GoTrueUser = check_response_json(response).await?;
        Ok(user.into())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "{}/authorize?provider={}&redirect_to={}",
            self.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }
}

async fn check_response(response: reqwest::Response) -> Result<(), SyncError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Auth(format!("HTTP {}: {}", status, error_message(&body))))
}

async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, SyncError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Auth rate limit hit (429)");
        }
        // GoTrue puts the user-facing reason ("Invalid login credentials") in the body.
        return Err(SyncError::Auth(error_message(&body)));
    }

    response
        .json()
        .await
        .map_err(|e| SyncError::Auth(format!("JSON parse error: {}", e)))
}
