// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote replica: one row per user holding the three documents.
//!
//! Implementations do not retry; the reconciler decides when to try again.

pub mod memory;
pub mod postgrest;

pub use memory::MemoryReplica;
pub use postgrest::PostgrestReplica;

use crate::error::SyncError;
use crate::models::{RemoteRecord, Session, Snapshot};
use async_trait::async_trait;

/// Acknowledgement of a successful upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertAck {
    /// Write timestamp (RFC 3339) as stored remotely
    pub updated_at: String,
}

/// Read/write access to the signed-in user's remote row.
#[async_trait]
pub trait RemoteReplica: Send + Sync {
    /// `false` when no backend is configured; every call then fails with
    /// [`SyncError::NotConfigured`] without any I/O.
    fn is_configured(&self) -> bool {
        true
    }

    /// Fetch the row for `session`'s user. `Ok(None)` if the user never pushed.
    async fn fetch(&self, session: &Session) -> Result<Option<RemoteRecord>, SyncError>;

    /// Replace the whole row for `session`'s user with `snapshot`.
    async fn upsert(&self, session: &Session, snapshot: &Snapshot) -> Result<UpsertAck, SyncError>;
}
