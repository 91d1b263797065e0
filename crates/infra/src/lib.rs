//! Infrastructure layer: job admission control and its configuration.

pub mod config;
pub mod jobs;

pub use config::{AdmissionConfig, ConfigError};
pub use jobs::{JobMetrics, JobQueue, QueueError, StatsSnapshot, TenantStats};
