// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types: sync/auth failures and their HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures of cloud-facing operations.
///
/// None of these are fatal: the reconciler turns them into status updates
/// and the local store keeps working.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// No backend credentials; permanent for the process lifetime.
    #[error("Cloud sync is not configured.")]
    NotConfigured,

    #[error("Sign in first.")]
    NotSignedIn,

    /// Another reconciliation is in flight for this identity.
    #[error("A cloud sync operation is already in progress.")]
    Busy,

    #[error("{0}")]
    Auth(String),

    #[error("Cloud read failed: {0}")]
    RemoteRead(String),

    #[error("Cloud write failed: {0}")]
    RemoteWrite(String),

    #[error("No cloud data found.")]
    NoRemoteData,
}

impl SyncError {
    /// Human-readable reason for status display, without the category prefix.
    pub fn reason(&self) -> String {
        match self {
            SyncError::Auth(msg) | SyncError::RemoteRead(msg) | SyncError::RemoteWrite(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Sync(err) => {
                let (status, code) = match err {
                    SyncError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
                    SyncError::NotSignedIn => (StatusCode::UNAUTHORIZED, "not_signed_in"),
                    SyncError::Busy => (StatusCode::CONFLICT, "sync_in_progress"),
                    SyncError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
                    SyncError::RemoteRead(_) | SyncError::RemoteWrite(_) => {
                        (StatusCode::BAD_GATEWAY, "cloud_error")
                    }
                    SyncError::NoRemoteData => (StatusCode::NOT_FOUND, "no_cloud_data"),
                };
                (status, code, Some(err.reason()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
