//! Observability counters and the stats snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use kbgate_core::TenantKey;

/// Monotonic job counters. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobMetrics {
    /// Submissions accepted into a tenant queue.
    pub enqueued: u64,
    /// Jobs taken off a queue and started.
    pub started: u64,
    /// Jobs whose body returned `Ok` (including skipped ones).
    pub completed: u64,
    /// Jobs whose body returned `Err`, panicked or was aborted.
    pub failed: u64,
    /// Submissions rejected because the tenant queue was full.
    pub dropped: u64,
    /// Completed jobs that reported the work was skipped.
    pub suppressed: u64,
}

/// Per-tenant view in a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TenantStats {
    pub running: usize,
    pub queued: usize,
}

/// Point-in-time view of the controller, taken under the coordinator lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub global_running: usize,
    pub metrics: JobMetrics,
    pub tenants: BTreeMap<TenantKey, TenantStats>,
    pub captured_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Stats for one tenant; zeroes if the tenant has never submitted.
    pub fn tenant(&self, key: impl Into<TenantKey>) -> TenantStats {
        self.tenants.get(&key.into()).copied().unwrap_or_default()
    }

    pub fn total_queued(&self) -> usize {
        self.tenants.values().map(|t| t.queued).sum()
    }
}
