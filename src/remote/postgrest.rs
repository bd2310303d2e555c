// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase (PostgREST) implementation of the remote replica.
//!
//! Table layout: `user_id` (primary key), `profile`, `logs`, `weekly`
//! (jsonb) and `updated_at` (timestamptz). Row-level security restricts
//! each user to their own row, so requests carry the user's access token.

use super::{RemoteReplica, UpsertAck};
use crate::config::CloudConfig;
use crate::error::SyncError;
use crate::models::{RemoteRecord, Session, Snapshot};
use crate::time_utils::now_rfc3339;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone)]
struct RestClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    table: String,
}

/// PostgREST replica client. Constructed disabled when no backend is configured.
#[derive(Clone)]
pub struct PostgrestReplica {
    client: Option<RestClient>,
}

/// Row body sent on upsert.
#[derive(Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    profile: &'a Option<Value>,
    logs: &'a Map<String, Value>,
    weekly: &'a Map<String, Value>,
    updated_at: &'a str,
}

#[derive(Deserialize)]
struct UpdatedAtRow {
    updated_at: Option<String>,
}

impl PostgrestReplica {
    pub fn new(config: &CloudConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed building replica HTTP client")?;

        Ok(Self {
            client: Some(RestClient {
                http,
                base_url: format!("{}/rest/v1", config.url),
                anon_key: config.anon_key.clone(),
                table: config.table.clone(),
            }),
        })
    }

    /// Replica for local-only mode. All operations return `NotConfigured`.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&RestClient, SyncError> {
        self.client.as_ref().ok_or(SyncError::NotConfigured)
    }
}

#[async_trait]
impl RemoteReplica for PostgrestReplica {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn fetch(&self, session: &Session) -> Result<Option<RemoteRecord>, SyncError> {
        let client = self.get_client()?;
        let url = format!(
            "{}/{}?select=profile,logs,weekly,updated_at&user_id=eq.{}",
            client.base_url,
            client.table,
            urlencoding::encode(session.user_id())
        );

        let response = client
            .http
            .get(&url)
            .header("apikey", &client.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| SyncError::RemoteRead(e.to_string()))?;

        let rows: Vec<RemoteRecord> = check_response_json(response)
            .await
            .map_err(SyncError::RemoteRead)?;

        tracing::debug!(user_id = session.user_id(), found = !rows.is_empty(), "Fetched remote row");
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, session: &Session, snapshot: &Snapshot) -> Result<UpsertAck, SyncError> {
        let client = self.get_client()?;
        let url = format!("{}/{}?on_conflict=user_id", client.base_url, client.table);
        let written_at = now_rfc3339();

        let row = UpsertRow {
            user_id: session.user_id(),
            profile: &snapshot.profile,
            logs: &snapshot.logs,
            weekly: &snapshot.weekly,
            updated_at: &written_at,
        };

        let response = client
            .http
            .post(&url)
            .header("apikey", &client.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .bearer_auth(&session.access_token)
            .json(&[row])
            .send()
            .await
            .map_err(|e| SyncError::RemoteWrite(e.to_string()))?;

        let rows: Vec<UpdatedAtRow> = check_response_json(response)
            .await
            .map_err(SyncError::RemoteWrite)?;

        let updated_at = rows
            .into_iter()
            .next()
            .and_then(|row| row.updated_at)
            .unwrap_or(written_at);

        tracing::debug!(user_id = session.user_id(), %updated_at, "Upserted remote row");
        Ok(UpsertAck { updated_at })
    }
}

/// Check response status and parse the JSON body. Errors are plain messages
/// so the caller can pick the read or write category.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            tracing::warn!("Replica rejected access token (401)");
        }
        return Err(format!("HTTP {}: {}", status, error_message(&body)));
    }

    response
        .json()
        .await
        .map_err(|e| format!("JSON parse error: {}", e))
}

/// Pull the human-readable part out of a PostgREST/GoTrue error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|field| v.get(*field).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
