// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync status and manual sync operations.

use crate::error::Result;
use crate::models::SyncStatus;
use crate::sync::SyncOutcome;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync/status", get(get_status))
        .route("/api/sync/now", post(sync_now))
        .route("/api/sync/pull", post(pull_from_cloud))
        .route("/api/sync/push", post(push_to_cloud))
}

/// Result of a manual sync operation.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncResponse {
    pub outcome: SyncOutcome,
    pub status: SyncStatus,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.reconciler.status())
}

async fn sync_now(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>> {
    let outcome = state.reconciler.sync_now().await?;
    Ok(respond(&state, outcome))
}

async fn pull_from_cloud(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>> {
    let outcome = state.reconciler.pull_from_cloud().await?;
    Ok(respond(&state, outcome))
}

async fn push_to_cloud(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>> {
    let outcome = state.reconciler.push_to_cloud().await?;
    Ok(respond(&state, outcome))
}

fn respond(state: &AppState, outcome: SyncOutcome) -> Json<SyncResponse> {
    Json(SyncResponse {
        outcome,
        status: state.reconciler.status(),
    })
}
