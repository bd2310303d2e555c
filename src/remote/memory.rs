// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory replica with failure injection, for tests and offline demos.

use super::{RemoteReplica, UpsertAck};
use crate::error::SyncError;
use crate::models::{RemoteRecord, Session, Snapshot};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Replica backed by a map of user id to row.
#[derive(Default)]
pub struct MemoryReplica {
    rows: DashMap<String, RemoteRecord>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reject_expired: AtomicBool,
    latency_ms: AtomicU64,
    read_count: AtomicUsize,
    write_count: AtomicUsize,
    /// Every successfully written snapshot, oldest first
    write_log: Mutex<Vec<(String, Snapshot)>>,
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row as if `user_id` had pushed `snapshot` earlier.
    pub fn insert(&self, user_id: &str, snapshot: Snapshot) {
        self.rows.insert(
            user_id.to_string(),
            RemoteRecord {
                snapshot,
                updated_at: Some(now_rfc3339()),
            },
        );
    }

    pub fn row(&self, user_id: &str) -> Option<RemoteRecord> {
        self.rows.get(user_id).map(|r| r.value().clone())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer calls made with an expired access token like the backend
    /// does, with an HTTP 401.
    pub fn set_reject_expired(&self, reject: bool) {
        self.reject_expired.store(reject, Ordering::SeqCst);
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.reject_expired.load(Ordering::SeqCst) && session.expires_within(chrono::Duration::zero())
    }

    /// Delay every call by `latency` (use with paused tokio time).
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of fetch attempts, including failed ones.
    pub fn reads(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Number of upsert attempts, including failed ones.
    pub fn writes(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Snapshots successfully written, oldest first.
    pub fn written(&self) -> Vec<(String, Snapshot)> {
        self.write_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

#[async_trait]
impl RemoteReplica for MemoryReplica {
    async fn fetch(&self, session: &Session) -> Result<Option<RemoteRecord>, SyncError> {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteRead("Mock replica read failure".into()));
        }
        if self.is_expired(session) {
            return Err(SyncError::RemoteRead("HTTP 401: JWT expired".into()));
        }
        Ok(self.row(session.user_id()))
    }

    async fn upsert(&self, session: &Session, snapshot: &Snapshot) -> Result<UpsertAck, SyncError> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::RemoteWrite("Mock replica write failure".into()));
        }
        if self.is_expired(session) {
            return Err(SyncError::RemoteWrite("HTTP 401: JWT expired".into()));
        }

        let updated_at = now_rfc3339();
        self.rows.insert(
            session.user_id().to_string(),
            RemoteRecord {
                snapshot: snapshot.clone(),
                updated_at: Some(updated_at.clone()),
            },
        );
        self.write_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((session.user_id().to_string(), snapshot.clone()));

        Ok(UpsertAck { updated_at })
    }
}
