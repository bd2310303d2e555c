// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Observable sync status.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Coarse phase shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncPhase {
    Disabled,
    Idle,
    Syncing,
    Synced,
    Error,
}

/// The reconciliation currently holding the single in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SyncOperation {
    /// One-time decision after sign-in (pull, initial upload, or nothing)
    Bootstrap,
    Push,
    Pull,
}

/// Sync status published to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub message: String,
    /// RFC 3339 time of the last successful read or write
    pub last_synced_at: Option<String>,
    /// Reason of the last failure, cleared by the next success
    pub error: Option<String>,
    pub in_flight: Option<SyncOperation>,
}

impl SyncStatus {
    pub const AVAILABLE: &'static str = "Cloud sync is available.";
    pub const DISABLED: &'static str = "Cloud sync disabled (no Supabase credentials set).";

    pub fn initial(configured: bool) -> Self {
        if configured {
            Self {
                phase: SyncPhase::Idle,
                message: Self::AVAILABLE.to_string(),
                last_synced_at: None,
                error: None,
                in_flight: None,
            }
        } else {
            Self {
                phase: SyncPhase::Disabled,
                message: Self::DISABLED.to_string(),
                last_synced_at: None,
                error: None,
                in_flight: None,
            }
        }
    }
}
