// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP API tests.
//!
//! These tests verify that:
//! 1. Document routes read and write the local store with input validation
//! 2. The optional API token guards `/api/*` only
//! 3. Sync and auth errors map to the documented status codes

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sustainable_cut::config::Config;
use sustainable_cut::models::SyncPhase;
use sustainable_cut::sync::messages;
use tower::ServiceExt;

mod common;
use common::{sample_snapshot, wait_for_status, EMAIL, PASSWORD};

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ─── Documents ───────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (app, _, _) = common::create_test_app().await;

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_loaded"], true);
    assert_eq!(body["sync"], "idle");
}

#[tokio::test]
async fn test_save_day_merges_fields() {
    let (app, state, _) = common::create_test_app().await;

    let (status, body) = send(
        &app,
        with_json("PUT", "/api/logs/2024-01-01", json!({"weight": 92.4})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"date": "2024-01-01", "weight": 92.4}));

    let (_, body) = send(
        &app,
        with_json("PUT", "/api/logs/2024-01-01", json!({"calories": 2250})),
    )
    .await;
    assert_eq!(
        body,
        json!({"date": "2024-01-01", "weight": 92.4, "calories": 2250})
    );

    let (_, logs) = send(&app, get("/api/logs")).await;
    assert_eq!(logs["2024-01-01"]["calories"], 2250);
    assert_eq!(state.store.logs().len(), 1);
}

#[tokio::test]
async fn test_save_day_rejects_bad_input() {
    let (app, state, _) = common::create_test_app().await;

    let (status, body) = send(
        &app,
        with_json("PUT", "/api/logs/2024-13-01", json!({"weight": 92.4})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = send(&app, with_json("PUT", "/api/logs/2024-01-01", json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.store.logs().is_empty());
}

#[tokio::test]
async fn test_profile_round_trip_and_clear() {
    let (app, _, _) = common::create_test_app().await;

    let (status, _) = send(&app, with_json("PUT", "/api/profile", json!("Ann"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let profile = json!({"name": "Ann", "goalWeight": 84.0});
    let (status, body) = send(&app, with_json("PUT", "/api/profile", profile.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, profile);

    let (_, body) = send(&app, with_json("PUT", "/api/profile", Value::Null)).await;
    assert_eq!(body, Value::Null);
    let (_, body) = send(&app, get("/api/profile")).await;
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_week_review_and_reset() {
    let (app, _, _) = common::create_test_app().await;

    let (status, _) = send(
        &app,
        with_json("PUT", "/api/weekly/w1", json!({"rating": 4, "notes": "ok"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    send(&app, with_json("PUT", "/api/logs/2024-01-01", json!({"weight": 92.4}))).await;

    let (_, snapshot) = send(&app, get("/api/snapshot")).await;
    assert_eq!(snapshot["weekly"]["w1"]["rating"], 4);

    let (status, snapshot) = send(&app, post("/api/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        snapshot,
        json!({"profile": null, "logs": {}, "weekly": {}})
    );
}

// ─── API token ───────────────────────────────────────────────

#[tokio::test]
async fn test_api_token_required_when_configured() {
    let config = Config {
        local_api_token: Some("s3cret".to_string()),
        ..Config::test_default()
    };
    let (app, _, _) = common::create_test_app_with_config(config).await;

    let (status, _) = send(&app, get("/api/snapshot")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/snapshot")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

    let right = Request::builder()
        .uri("/api/snapshot")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, right).await.0, StatusCode::OK);

    // Health and auth stay public.
    assert_eq!(send(&app, get("/health")).await.0, StatusCode::OK);
    assert_eq!(send(&app, get("/auth/session")).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_api_open_without_token() {
    let (app, _, _) = common::create_test_app().await;
    assert_eq!(send(&app, get("/api/snapshot")).await.0, StatusCode::OK);
}

// ─── Sync ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sync_local_only_mode() {
    let (app, state) = common::create_local_only_app().await;

    let (status, body) = send(&app, get("/api/sync/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "disabled");

    for uri in ["/api/sync/now", "/api/sync/pull", "/api/sync/push"] {
        let (status, body) = send(&app, post(uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(body["error"], "not_configured");
    }

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/auth/sign-in",
            json!({"email": EMAIL, "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Documents still work.
    let (status, _) = send(&app, with_json("PUT", "/api/weekly/w1", json!({"rating": 3}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.store.weekly().len(), 1);
}

#[tokio::test]
async fn test_sync_requires_sign_in() {
    let (app, _, _) = common::create_test_app().await;

    let (status, body) = send(&app, post("/api/sync/now")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_signed_in");
}

#[tokio::test]
async fn test_sign_in_then_manual_sync() {
    let (app, state, harness) = common::create_test_app().await;
    let mut status_rx = state.reconciler.subscribe();

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/auth/sign-in",
            json!({"email": EMAIL, "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert_eq!(body["email"], EMAIL);
    assert!(body.get("access_token").is_none());

    wait_for_status(&mut status_rx, |s| {
        s.message == messages::NO_CLOUD_DATA_YET && s.in_flight.is_none()
    })
    .await;

    send(&app, with_json("PUT", "/api/logs/2024-01-01", json!({"weight": 92.4}))).await;
    let (status, body) = send(&app, post("/api/sync/now")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "pushed");
    assert_eq!(body["status"]["phase"], "synced");
    assert_eq!(harness.remote.writes(), 1);

    let (_, body) = send(&app, post("/api/sync/now")).await;
    assert_eq!(body["outcome"], "already_synced");

    let (status, body) = send(&app, post("/auth/sign-out")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "anonymous");
    assert_eq!(state.reconciler.status().message, messages::SIGNED_OUT);
}

#[tokio::test]
async fn test_pull_maps_errors() {
    let (app, state, harness) = common::create_test_app().await;
    harness.sign_in_and_bootstrap(EMAIL).await;

    let (status, body) = send(&app, post("/api/sync/pull")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no_cloud_data");

    harness.remote.insert(&harness.user_id, sample_snapshot("Ann"));
    harness.remote.set_fail_reads(true);
    let (status, body) = send(&app, post("/api/sync/pull")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "cloud_error");
    assert_eq!(state.reconciler.status().phase, SyncPhase::Error);

    harness.remote.set_fail_reads(false);
    let (status, body) = send(&app, post("/api/sync/pull")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "pulled");
    assert_eq!(state.store.snapshot(), sample_snapshot("Ann"));
}

// ─── Auth ────────────────────────────────────────────────────

#[tokio::test]
async fn test_sign_in_validation() {
    let (app, state, _) = common::create_test_app().await;

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/auth/sign-in",
            json!({"email": "not-an-email", "password": PASSWORD}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = send(
        &app,
        with_json("POST", "/auth/sign-up", json!({"email": EMAIL, "password": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Validation failures never reach the backend.
    assert_eq!(state.reconciler.status().phase, SyncPhase::Idle);

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/auth/sign-in",
            json!({"email": EMAIL, "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "auth_error");
    assert_eq!(body["details"], "Invalid login credentials");
    assert_eq!(state.reconciler.status().message, messages::SIGN_IN_FAILED);
}

#[tokio::test]
async fn test_sign_up_response() {
    let (app, _, harness) = common::create_test_app().await;
    harness.provider.set_auto_confirm(false);

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/auth/sign-up",
            json!({"email": "carol@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confirmation_required"], true);
    assert_eq!(body["session"]["state"], "anonymous");
}

#[tokio::test]
async fn test_provider_redirect() {
    let (app, _, _) = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(get("/auth/provider/github"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(
        location,
        "memory://authorize?provider=github&redirect_to=http%3A%2F%2Flocalhost%3A5173"
    );
}

#[tokio::test]
async fn test_provider_callback() {
    let (app, _, harness) = common::create_test_app().await;
    let session = harness
        .provider
        .issue_session(EMAIL, chrono::Duration::hours(1))
        .unwrap();

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            "/auth/callback",
            json!({
                "access_token": session.access_token,
                "refresh_token": session.refresh_token,
                "expires_in": 3600
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], harness.user_id.as_str());

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/auth/callback",
            json!({"access_token": "", "refresh_token": "r", "expires_in": 3600}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
