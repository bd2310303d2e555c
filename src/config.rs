// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Cloud sync is optional: when the Supabase URL or anon key is missing the
//! app runs in local-only mode and every cloud operation fails fast.

use crate::sync::DEFAULT_DEBOUNCE;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SYNC_TABLE: &str = "sc3_user_state";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;

/// Supabase project credentials. Both parts are public (anon key).
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// Project base URL, without trailing slash
    pub url: String,
    /// Anonymous API key sent as `apikey`
    pub anon_key: String,
    /// Table holding one row per user
    pub table: String,
    /// Per-request timeout for REST and auth calls
    pub timeout: Duration,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud backend, or `None` for local-only mode
    pub cloud: Option<CloudConfig>,
    /// Directory holding the local documents and the persisted session
    pub data_dir: PathBuf,
    /// Frontend URL (CORS origin and OAuth redirect target)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Quiet period before local edits are pushed
    pub sync_debounce: Duration,
    /// Bearer token required on `/api/*` when set
    pub local_api_token: Option<String>,
}

impl Config {
    /// Deterministic local-only config for tests.
    pub fn test_default() -> Self {
        Self {
            cloud: None,
            data_dir: PathBuf::from("./data"),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            sync_debounce: DEFAULT_DEBOUNCE,
            local_api_token: None,
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let timeout = Duration::from_secs(
            env::var("REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS),
        );

        let cloud = match (non_empty("SUPABASE_URL"), non_empty("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                reqwest::Url::parse(&url)
                    .map_err(|e| ConfigError::Invalid("SUPABASE_URL", e.to_string()))?;
                Some(CloudConfig {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                    table: non_empty("SYNC_TABLE").unwrap_or_else(|| DEFAULT_SYNC_TABLE.to_string()),
                    timeout,
                })
            }
            _ => None,
        };

        let sync_debounce = match env::var("SYNC_DEBOUNCE_MS") {
            Ok(v) => Duration::from_millis(
                v.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("SYNC_DEBOUNCE_MS", v.clone()))?,
            ),
            Err(_) => DEFAULT_DEBOUNCE,
        };

        Ok(Self {
            cloud,
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string())),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            sync_debounce,
            local_api_token: non_empty("LOCAL_API_TOKEN"),
        })
    }

    /// Whether a cloud backend is configured.
    pub fn cloud_configured(&self) -> bool {
        self.cloud.is_some()
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
