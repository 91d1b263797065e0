//! Tenant-aware admission control for background jobs.
//!
//! ## Design
//!
//! - Every job is submitted under a tenant key; each tenant has a FIFO queue
//!   bounded by `queue_max`
//! - A job starts only while its tenant is below `per_tenant_limit` **and**
//!   the process is below `global_limit`
//! - A full queue sheds the new job (counted as `dropped`, logged); submission
//!   never blocks and never reports an error to the caller
//! - Completion (success or failure) frees both slots and immediately drains
//!   queued work; there is no poller
//! - Job failures are counted and logged, never retried or propagated
//!
//! ## Components
//!
//! - `JobQueue`: the controller handle (`submit`, `submit_job`, `stats`, `wait_idle`)
//! - `StatsSnapshot` / `JobMetrics`: consistent read-only view for operators
//!
//! ## Job lifecycle
//!
//! ```text
//! submit ──► Pending ──► Running ──► Completed | Failed
//!               │
//!               └──► Dropped (queue full at submission)
//! ```

pub mod queue;
pub mod stats;
pub mod types;

pub use queue::{JobQueue, QueueError};
pub use stats::{JobMetrics, StatsSnapshot, TenantStats};
pub use types::JobFn;
