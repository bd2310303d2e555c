// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Sustainable Cut: local-first diet/training logs with optional cloud sync.
//!
//! The local store is the system of record. When a Supabase backend is
//! configured and a user is signed in, the sync reconciler keeps a single
//! remote row per user in step with the local documents (last writer wins).

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod remote;
pub mod routes;
pub mod store;
pub mod sync;
pub mod time_utils;

use auth::AuthSessionManager;
use config::Config;
use store::LocalStore;
use sync::SyncReconciler;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: LocalStore,
    pub auth: AuthSessionManager,
    pub reconciler: SyncReconciler,
}
