// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sustainable Cut local API server
//!
//! Serves the diet/training documents to the UI from a local store and,
//! when Supabase credentials are set, keeps them synced to the cloud.

use anyhow::Context;
use std::sync::Arc;
use sustainable_cut::{
    auth::{AuthSessionManager, GoTrueClient},
    config::Config,
    remote::{PostgrestReplica, RemoteReplica},
    store::{FileBackend, LocalStore, StorageBackend},
    sync::SyncReconciler,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        port = config.port,
        cloud = config.cloud_configured(),
        "Starting Sustainable Cut API"
    );

    // Local store: one JSON file per document under DATA_DIR
    let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(config.data_dir.clone()));
    let store = LocalStore::new(backend.clone());
    store.load().await;
    tracing::info!(
        path = %config.data_dir.display(),
        has_content = store.snapshot().has_content(),
        "Local store loaded"
    );

    // Cloud backend, or local-only mode
    let (remote, auth): (Arc<dyn RemoteReplica>, AuthSessionManager) = match &config.cloud {
        Some(cloud) => {
            let remote = PostgrestReplica::new(cloud)?;
            let provider = GoTrueClient::new(cloud)?;
            tracing::info!(url = %cloud.url, table = %cloud.table, "Cloud sync configured");
            (
                Arc::new(remote),
                AuthSessionManager::new(Arc::new(provider), backend),
            )
        }
        None => {
            tracing::info!("No Supabase credentials set, running local only");
            (
                Arc::new(PostgrestReplica::disabled()),
                AuthSessionManager::disabled(),
            )
        }
    };

    let reconciler = SyncReconciler::new(store.clone(), remote, auth.clone(), config.sync_debounce);

    // Resolve the persisted session before the driver starts reacting to it
    if reconciler.is_configured() {
        if let Err(e) = reconciler.resolve_session().await {
            tracing::warn!(error = %e, "Existing session could not be restored");
        }
    }
    let _driver = reconciler.spawn();

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        auth,
        reconciler,
    });

    // Build router
    let app = sustainable_cut::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sustainable_cut=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
