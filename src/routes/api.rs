// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document routes: read and write the local store.
//!
//! Writes only touch the local store; the sync driver sees the revision bump
//! and schedules the cloud push.

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use crate::time_utils::is_iso_date;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Document routes (optionally token protected, see routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/logs", get(get_logs).put(put_logs))
        .route("/api/logs/{date}", put(put_day))
        .route("/api/weekly", get(get_weekly).put(put_weekly))
        .route("/api/weekly/{week}", put(put_week))
        .route("/api/reset", post(reset))
}

async fn get_snapshot(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.store.snapshot())
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.store.profile().unwrap_or(Value::Null))
}

/// Replace the profile. `null` clears it (back to onboarding).
async fn put_profile(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let profile = match body {
        Value::Null => None,
        Value::Object(_) => Some(body),
        _ => {
            return Err(AppError::BadRequest(
                "profile must be an object or null".to_string(),
            ))
        }
    };

    state.store.set_profile(profile).await;
    Ok(Json(state.store.profile().unwrap_or(Value::Null)))
}

// ─── Day logs ────────────────────────────────────────────────

async fn get_logs(State(state): State<Arc<AppState>>) -> Json<Map<String, Value>> {
    Json(state.store.logs())
}

async fn put_logs(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Map<String, Value>>> {
    let logs = expect_object(body, "logs")?;
    state.store.set_logs(logs).await;
    Ok(Json(state.store.logs()))
}

/// Merge fields into one day's record; returns the merged record.
async fn put_day(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    if !is_iso_date(&date) {
        return Err(AppError::BadRequest(format!(
            "date must be YYYY-MM-DD, got {:?}",
            date
        )));
    }
    let update = expect_object(body, "day update")?;

    tracing::debug!(date = %date, fields = update.len(), "Saving day");
    let record = state.store.save_day(&date, update).await;
    Ok(Json(record))
}

// ─── Weekly reviews ──────────────────────────────────────────

async fn get_weekly(State(state): State<Arc<AppState>>) -> Json<Map<String, Value>> {
    Json(state.store.weekly())
}

async fn put_weekly(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Map<String, Value>>> {
    let weekly = expect_object(body, "weekly")?;
    state.store.set_weekly(weekly).await;
    Ok(Json(state.store.weekly()))
}

async fn put_week(
    State(state): State<Arc<AppState>>,
    Path(week): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    if week.trim().is_empty() {
        return Err(AppError::BadRequest("week id must not be empty".to_string()));
    }
    let review = Value::Object(expect_object(body, "week review")?);

    state.store.save_week(&week, review.clone()).await;
    Ok(Json(review))
}

// ─── Reset ───────────────────────────────────────────────────

/// Clear all documents. The next continuous sync pushes the empty snapshot.
async fn reset(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    tracing::info!("Resetting all local documents");
    state.store.reset().await;
    Json(state.store.snapshot())
}

fn expect_object(body: Value, what: &str) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest(format!("{} must be a JSON object", what))),
    }
}
