// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use sustainable_cut::auth::{AuthSessionManager, MemoryAuthProvider};
use sustainable_cut::config::Config;
use sustainable_cut::models::{Session, Snapshot, SyncStatus};
use sustainable_cut::remote::{MemoryReplica, PostgrestReplica};
use sustainable_cut::routes::create_router;
use sustainable_cut::store::{LocalStore, MemoryBackend};
use sustainable_cut::sync::{SyncReconciler, DEFAULT_DEBOUNCE};
use sustainable_cut::AppState;
use tokio::sync::watch;

#[allow(dead_code)]
pub const EMAIL: &str = "ann@example.com";
#[allow(dead_code)]
pub const PASSWORD: &str = "hunter22";
#[allow(dead_code)]
pub const OTHER_EMAIL: &str = "bob@example.com";

/// In-memory collaborators wired into a reconciler, with handles kept for
/// seeding and inspection.
#[allow(dead_code)]
pub struct TestHarness {
    pub storage: Arc<MemoryBackend>,
    pub remote: Arc<MemoryReplica>,
    pub provider: Arc<MemoryAuthProvider>,
    pub store: LocalStore,
    pub auth: AuthSessionManager,
    pub reconciler: SyncReconciler,
    /// User id of `EMAIL`
    pub user_id: String,
    /// User id of `OTHER_EMAIL`
    pub other_user_id: String,
}

#[allow(dead_code)]
impl TestHarness {
    /// Cloud-configured harness with a loaded (empty) store, nobody signed in.
    pub async fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE).await
    }

    pub async fn with_debounce(debounce: Duration) -> Self {
        let storage = Arc::new(MemoryBackend::new());
        let remote = Arc::new(MemoryReplica::new());
        let provider = Arc::new(MemoryAuthProvider::new());
        let user_id = provider.add_account(EMAIL, PASSWORD);
        let other_user_id = provider.add_account(OTHER_EMAIL, PASSWORD);

        let store = LocalStore::new(storage.clone());
        store.load().await;

        let auth = AuthSessionManager::new(provider.clone(), storage.clone());
        auth.check_existing_session()
            .await
            .expect("empty session store resolves");

        let reconciler = SyncReconciler::new(store.clone(), remote.clone(), auth.clone(), debounce);

        Self {
            storage,
            remote,
            provider,
            store,
            auth,
            reconciler,
            user_id,
            other_user_id,
        }
    }

    /// Sign in through the auth manager only (no reconciler reaction), so
    /// tests decide when bootstrap runs.
    pub async fn sign_in_quietly(&self, email: &str) -> Session {
        self.auth
            .sign_in(email, PASSWORD)
            .await
            .expect("test account signs in")
    }

    /// Sign in and bootstrap, returning once the identity is bootstrapped.
    pub async fn sign_in_and_bootstrap(&self, email: &str) -> Session {
        let session = self.sign_in_quietly(email).await;
        self.reconciler
            .bootstrap()
            .await
            .expect("bootstrap succeeds");
        session
    }
}

/// A harness whose remote and auth are both unconfigured.
#[allow(dead_code)]
pub async fn disabled_reconciler() -> (LocalStore, SyncReconciler) {
    let store = LocalStore::new(Arc::new(MemoryBackend::new()));
    store.load().await;
    let reconciler = SyncReconciler::new(
        store.clone(),
        Arc::new(PostgrestReplica::disabled()),
        AuthSessionManager::disabled(),
        DEFAULT_DEBOUNCE,
    );
    (store, reconciler)
}

/// Wait until the status satisfies `pred`, failing the test after 10s.
#[allow(dead_code)]
pub async fn wait_for_status(
    rx: &mut watch::Receiver<SyncStatus>,
    pred: impl Fn(&SyncStatus) -> bool,
) -> SyncStatus {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for sync status")
        .expect("status channel closed")
        .clone()
}

/// A realistic day record.
#[allow(dead_code)]
pub fn day(weight: f64, calories: u32) -> Map<String, Value> {
    match json!({
        "weight": weight,
        "calories": calories,
        "protein": 180,
        "trained": true,
        "steps": 9000
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[allow(dead_code)]
pub fn profile(name: &str) -> Value {
    json!({
        "name": name,
        "startWeight": 92.5,
        "goalWeight": 84.0,
        "startDate": "2024-01-01"
    })
}

/// Snapshot with all three documents populated.
#[allow(dead_code)]
pub fn sample_snapshot(name: &str) -> Snapshot {
    let mut logs = Map::new();
    logs.insert(
        "2024-01-01".to_string(),
        json!({"date": "2024-01-01", "weight": 92.5, "calories": 2300}),
    );
    let mut weekly = Map::new();
    weekly.insert("w1".to_string(), json!({"rating": 4, "notes": "solid start"}));

    Snapshot {
        profile: Some(profile(name)),
        logs,
        weekly,
    }
}

/// Create a test app backed by in-memory collaborators.
/// Returns the router, the shared state and the harness behind it.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>, TestHarness) {
    create_test_app_with_config(Config::test_default()).await
}

#[allow(dead_code)]
pub async fn create_test_app_with_config(
    config: Config,
) -> (axum::Router, Arc<AppState>, TestHarness) {
    let harness = TestHarness::new().await;
    let state = Arc::new(AppState {
        config,
        store: harness.store.clone(),
        auth: harness.auth.clone(),
        reconciler: harness.reconciler.clone(),
    });
    (create_router(state.clone()), state, harness)
}

/// Create a test app in local-only mode.
#[allow(dead_code)]
pub async fn create_local_only_app() -> (axum::Router, Arc<AppState>) {
    let (store, reconciler) = disabled_reconciler().await;
    let state = Arc::new(AppState {
        config: Config::test_default(),
        store,
        auth: reconciler.auth().clone(),
        reconciler,
    });
    (create_router(state.clone()), state)
}
