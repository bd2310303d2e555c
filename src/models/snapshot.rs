// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! The three synced documents and the snapshot that groups them.
//!
//! Document contents belong to the UI (onboarding profile, day check-ins,
//! weekly reviews) and are kept as opaque JSON here. Only the outer shape is
//! enforced: `profile` is an object or `null`, `logs` and `weekly` are objects.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One of the three independently stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    Profile,
    Logs,
    Weekly,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 3] = [DocumentKey::Profile, DocumentKey::Logs, DocumentKey::Weekly];

    /// Key used in the local key-value store.
    pub fn storage_key(self) -> &'static str {
        match self {
            DocumentKey::Profile => "sc3_profile",
            DocumentKey::Logs => "sc3_logs",
            DocumentKey::Weekly => "sc3_weekly",
        }
    }
}

/// Canonical serialized form of a snapshot, used for dirty checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

/// The `(profile, logs, weekly)` triple: unit of comparison and replication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `None` means the user has not onboarded
    #[serde(default, deserialize_with = "object_or_null")]
    pub profile: Option<Value>,
    /// Day records keyed by ISO date (`YYYY-MM-DD`)
    #[serde(default, deserialize_with = "object_or_empty")]
    pub logs: Map<String, Value>,
    /// Week reviews keyed by week identifier (`w1`..`w16`)
    #[serde(default, deserialize_with = "object_or_empty")]
    pub weekly: Map<String, Value>,
}

impl Snapshot {
    /// Whether any document holds user data.
    pub fn has_content(&self) -> bool {
        self.profile.is_some() || !self.logs.is_empty() || !self.weekly.is_empty()
    }

    /// Structural fingerprint. Map keys serialize sorted, so equal
    /// documents always produce equal fingerprints.
    pub fn fingerprint(&self) -> Fingerprint {
        let json = serde_json::json!({
            "profile": self.profile,
            "logs": self.logs,
            "weekly": self.weekly,
        });
        Fingerprint(json.to_string())
    }

    /// The document stored under `key`, as JSON.
    pub fn document(&self, key: DocumentKey) -> Value {
        match key {
            DocumentKey::Profile => self.profile.clone().unwrap_or(Value::Null),
            DocumentKey::Logs => Value::Object(self.logs.clone()),
            DocumentKey::Weekly => Value::Object(self.weekly.clone()),
        }
    }

    /// Replace one document, normalizing values of the wrong shape to empty.
    pub fn set_document(&mut self, key: DocumentKey, value: Value) {
        match key {
            DocumentKey::Profile => self.profile = normalize_profile(value),
            DocumentKey::Logs => self.logs = normalize_map(value),
            DocumentKey::Weekly => self.weekly = normalize_map(value),
        }
    }
}

/// The single remote row held for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// Server write time; display only, never used for conflict resolution
    #[serde(default)]
    pub updated_at: Option<String>,
}

pub(crate) fn normalize_profile(value: Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value),
        _ => None,
    }
}

pub(crate) fn normalize_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn object_or_null<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_profile(Value::deserialize(deserializer)?))
}

fn object_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_map(Value::deserialize(deserializer)?))
}
