// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod session;
pub mod snapshot;
pub mod status;

pub use session::{AuthState, Session, SessionUser};
pub use snapshot::{DocumentKey, Fingerprint, RemoteRecord, Snapshot};
pub use status::{SyncOperation, SyncPhase, SyncStatus};
