//! Status model — service states, counters and recent activity.
//!
//! The snapshot is owned by the poller and patched field-by-field as each
//! backend check resolves. Readers only ever see whole published copies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub mod derive;

// ── Core Types ──────────────────────────────────────────────────────

/// A polled backend subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKey {
    AiIndex,
    ComputeApi,
    Database,
    FileTransfer,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 4] = [
        ServiceKey::AiIndex,
        ServiceKey::ComputeApi,
        ServiceKey::Database,
        ServiceKey::FileTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::AiIndex => "ai-index",
            ServiceKey::ComputeApi => "compute-api",
            ServiceKey::Database => "database",
            ServiceKey::FileTransfer => "file-transfer",
        }
    }

    /// Human-readable label for console output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKey::AiIndex => "AI Index",
            ServiceKey::ComputeApi => "Compute API",
            ServiceKey::Database => "Database",
            ServiceKey::FileTransfer => "File Transfer",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    #[default]
    Inactive,
    Error,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceState::Active => "active",
            ServiceState::Inactive => "inactive",
            ServiceState::Error => "error",
        })
    }
}

/// Outcome of one processing-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityOutcome {
    Success,
    Info,
    /// Display-only; derivation never produces it.
    #[allow(dead_code)]
    Warning,
    Error,
}

/// Last known state of a single service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceEntry {
    pub state: ServiceState,
    pub checked_at: Option<DateTime<Utc>>,
    /// Extra context for the status chip, e.g. the raw index state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total_articles: u64,
    pub processed_today: u64,
    pub vector_indexes: u64,
    pub ftp_files: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub id: String,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub outcome: ActivityOutcome,
    /// Backend process type that produced the entry ("System" when absent).
    pub service: String,
}

/// The aggregate record published to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub services: BTreeMap<ServiceKey, ServiceEntry>,
    pub counters: Counters,
    /// Most-recent-first.
    pub activity: Vec<ActivityRecord>,
    /// Number of poll cycles started so far.
    pub cycle: u64,
    /// When the last poll cycle finished.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// False while a cycle is in progress.
    pub settled: bool,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

// ── Patches ─────────────────────────────────────────────────────────

/// One independent field update produced by a single backend check.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotPatch {
    CycleStarted,
    Service {
        key: ServiceKey,
        state: ServiceState,
        detail: Option<String>,
    },
    /// Stats counters merged with the cycle's direct observations, which
    /// take precedence. `stats: None` keeps the previous aggregate values.
    Counters {
        stats: Option<Counters>,
        vector_indexes: Option<u64>,
        ftp_files: Option<u64>,
    },
    Activity(Vec<ActivityRecord>),
    CycleFinished,
}

impl StatusSnapshot {
    /// Empty snapshot: every service inactive, counters zero, no activity.
    pub fn new() -> Self {
        let services = ServiceKey::ALL
            .iter()
            .map(|key| (*key, ServiceEntry::default()))
            .collect();

        Self {
            services,
            counters: Counters::default(),
            activity: Vec::new(),
            cycle: 0,
            refreshed_at: None,
            settled: false,
        }
    }

    pub fn state(&self, key: ServiceKey) -> ServiceState {
        self.services
            .get(&key)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    pub fn entry(&self, key: ServiceKey) -> Option<&ServiceEntry> {
        self.services.get(&key)
    }

    /// Apply one patch. Only the fields the patch names are touched.
    pub fn apply(&mut self, patch: SnapshotPatch, now: DateTime<Utc>) {
        match patch {
            SnapshotPatch::CycleStarted => {
                self.cycle += 1;
                self.settled = false;
            }
            SnapshotPatch::Service { key, state, detail } => {
                let entry = self.services.entry(key).or_default();
                entry.state = state;
                entry.checked_at = Some(now);
                // Detail text is dropped for failed checks.
                entry.detail = if state == ServiceState::Error { None } else { detail };
            }
            SnapshotPatch::Counters { stats, vector_indexes, ftp_files } => {
                if let Some(counters) = stats {
                    self.counters = counters;
                }
                if let Some(n) = vector_indexes {
                    self.counters.vector_indexes = n;
                }
                if let Some(n) = ftp_files {
                    self.counters.ftp_files = n;
                }
            }
            SnapshotPatch::Activity(records) => self.activity = records,
            SnapshotPatch::CycleFinished => {
                self.refreshed_at = Some(now);
                self.settled = true;
            }
        }
    }
}
