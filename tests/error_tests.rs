// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use sustainable_cut::error::{AppError, SyncError};

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_sync_error_status_codes() {
    let cases = [
        (SyncError::NotConfigured, StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
        (SyncError::NotSignedIn, StatusCode::UNAUTHORIZED, "not_signed_in"),
        (SyncError::Busy, StatusCode::CONFLICT, "sync_in_progress"),
        (SyncError::Auth("bad".into()), StatusCode::UNAUTHORIZED, "auth_error"),
        (SyncError::RemoteRead("down".into()), StatusCode::BAD_GATEWAY, "cloud_error"),
        (SyncError::RemoteWrite("down".into()), StatusCode::BAD_GATEWAY, "cloud_error"),
        (SyncError::NoRemoteData, StatusCode::NOT_FOUND, "no_cloud_data"),
    ];

    for (err, expected_status, expected_code) in cases {
        let (status, body) = render(AppError::from(err)).await;
        assert_eq!(status, expected_status);
        assert_eq!(body["error"], expected_code);
    }
}

#[tokio::test]
async fn test_details_carry_reason_without_prefix() {
    let (_, body) = render(SyncError::RemoteWrite("HTTP 500: boom".into()).into()).await;
    assert_eq!(body["details"], "HTTP 500: boom");

    let (_, body) = render(SyncError::NotConfigured.into()).await;
    assert_eq!(body["details"], "Cloud sync is not configured.");
}

#[tokio::test]
async fn test_internal_error_hides_details() {
    let (status, body) = render(AppError::Internal(anyhow::anyhow!("secret path /var/x"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}

#[test]
fn test_reason_strips_category() {
    assert_eq!(
        SyncError::RemoteRead("timeout".into()).to_string(),
        "Cloud read failed: timeout"
    );
    assert_eq!(SyncError::RemoteRead("timeout".into()).reason(), "timeout");
    assert_eq!(SyncError::NoRemoteData.reason(), "No cloud data found.");
}
