// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local store: the system of record for the three documents.
//!
//! Reads are served from memory and never touch the backend after the
//! initial load. Writes update memory first (the caller always sees its own
//! write), notify subscribers, then persist. Persistence failures are logged
//! and otherwise ignored: the running session is unaffected, only durability
//! across restarts is lost.

pub mod backend;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};

use crate::models::{DocumentKey, Snapshot};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Mutex};

struct StoreInner {
    backend: Arc<dyn StorageBackend>,
    documents: RwLock<Snapshot>,
    /// Serializes backend writes so the last persisted value is the latest in memory.
    persist_lock: Mutex<()>,
    loaded: watch::Sender<bool>,
    /// Bumped on every in-memory change.
    revision: watch::Sender<u64>,
}

/// Handle to the local documents. Cheap to clone.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (loaded, _) = watch::channel(false);
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                backend,
                documents: RwLock::new(Snapshot::default()),
                persist_lock: Mutex::new(()),
                loaded,
                revision,
            }),
        }
    }

    /// Load all documents from the backend.
    ///
    /// A document that is missing, unreadable or not valid JSON starts empty.
    pub async fn load(&self) {
        let reads = DocumentKey::ALL.map(|key| async move {
            let value = match self.inner.backend.get(key.storage_key()).await {
                Ok(Some(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(key = key.storage_key(), error = %e, "Stored document is not valid JSON, starting fresh");
                        Value::Null
                    }
                },
                Ok(None) => Value::Null,
                Err(e) => {
                    tracing::warn!(key = key.storage_key(), error = %e, "Local read failed, starting fresh");
                    Value::Null
                }
            };
            (key, value)
        });
        let loaded = join_all(reads).await;

        {
            let mut docs = self.write_docs();
            for (key, value) in loaded {
                docs.set_document(key, value);
            }
            tracing::debug!(
                has_profile = docs.profile.is_some(),
                days = docs.logs.len(),
                weeks = docs.weekly.len(),
                "Local documents loaded"
            );
        }

        self.bump_revision();
        self.inner.loaded.send_replace(true);
    }

    pub fn is_loaded(&self) -> bool {
        *self.inner.loaded.borrow()
    }

    /// Resolve once the initial load has finished.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.inner.loaded.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|loaded| *loaded).await;
    }

    /// Subscribe to change notifications (the value is a revision counter).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read_docs().clone()
    }

    pub fn profile(&self) -> Option<Value> {
        self.read_docs().profile.clone()
    }

    pub fn logs(&self) -> Map<String, Value> {
        self.read_docs().logs.clone()
    }

    pub fn weekly(&self) -> Map<String, Value> {
        self.read_docs().weekly.clone()
    }

    // ─── Writes ──────────────────────────────────────────────────

    pub async fn set_profile(&self, profile: Option<Value>) {
        self.commit(&[DocumentKey::Profile], |docs| {
            docs.set_document(DocumentKey::Profile, profile.unwrap_or(Value::Null))
        })
        .await;
    }

    pub async fn set_logs(&self, logs: Map<String, Value>) {
        self.commit(&[DocumentKey::Logs], |docs| docs.logs = logs).await;
    }

    pub async fn set_weekly(&self, weekly: Map<String, Value>) {
        self.commit(&[DocumentKey::Weekly], |docs| docs.weekly = weekly)
            .await;
    }

    /// Shallow-merge `update` into the day record for `date` and stamp the date.
    ///
    /// Returns the merged record.
    pub async fn save_day(&self, date: &str, update: Map<String, Value>) -> Value {
        let mut merged = Value::Null;
        self.commit(&[DocumentKey::Logs], |docs| {
            let mut day = match docs.logs.remove(date) {
                Some(Value::Object(existing)) => existing,
                _ => Map::new(),
            };
            day.extend(update);
            day.insert("date".to_string(), Value::String(date.to_string()));
            merged = Value::Object(day);
            docs.logs.insert(date.to_string(), merged.clone());
        })
        .await;
        merged
    }

    /// Set the review for one program week.
    pub async fn save_week(&self, week: &str, review: Value) {
        self.commit(&[DocumentKey::Weekly], |docs| {
            docs.weekly.insert(week.to_string(), review);
        })
        .await;
    }

    /// Replace all three documents as one logical write.
    ///
    /// Memory is swapped atomically. The backend still receives three
    /// separate writes (profile, logs, weekly in that order); a crash
    /// between them leaves a mixed snapshot on disk until the next sync.
    pub async fn replace_all(&self, snapshot: Snapshot) {
        self.swap_all(snapshot);
        self.persist_all().await;
    }

    /// In-memory half of [`replace_all`](Self::replace_all): swap and notify,
    /// without waiting for the backend. Follow with
    /// [`persist_all`](Self::persist_all).
    pub fn swap_all(&self, snapshot: Snapshot) {
        self.apply(|docs| *docs = snapshot);
    }

    /// Write every document from memory to the backend.
    pub async fn persist_all(&self) {
        self.persist_keys(&DocumentKey::ALL).await;
    }

    /// Clear every document, returning the app to onboarding.
    pub async fn reset(&self) {
        tracing::info!("Resetting local documents");
        self.replace_all(Snapshot::default()).await;
    }

    /// Apply `mutate` in memory, notify subscribers, then persist `keys`.
    async fn commit(&self, keys: &[DocumentKey], mutate: impl FnOnce(&mut Snapshot)) {
        self.apply(mutate);
        self.persist_keys(keys).await;
    }

    fn apply(&self, mutate: impl FnOnce(&mut Snapshot)) {
        {
            let mut docs = self.write_docs();
            mutate(&mut *docs);
        }
        self.bump_revision();
    }

    async fn persist_keys(&self, keys: &[DocumentKey]) {
        let _guard = self.inner.persist_lock.lock().await;
        for &key in keys {
            // Read under the persist lock so a slower earlier write can't land last.
            let value = self.read_docs().document(key);
            self.persist(key, &value).await;
        }
    }

    async fn persist(&self, key: DocumentKey, value: &Value) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(key = key.storage_key(), error = %e, "Failed to serialize document");
                return;
            }
        };

        if let Err(e) = self.inner.backend.set(key.storage_key(), &text).await {
            tracing::error!(key = key.storage_key(), error = %e, "Save failed");
        }
    }

    fn bump_revision(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    fn read_docs(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.inner
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_docs(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.inner
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
