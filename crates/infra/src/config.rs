//! Admission controller configuration.
//!
//! Read once at process start from the environment. There is no runtime
//! reconfiguration: a running [`JobQueue`](crate::jobs::JobQueue) keeps the
//! values it was built with.
//!
//! | variable                     | field              | default |
//! |------------------------------|--------------------|---------|
//! | `KB_JOB_TENANT_CONCURRENCY`  | `per_tenant_limit` | 1       |
//! | `KB_JOB_GLOBAL_CONCURRENCY`  | `global_limit`     | 4       |
//! | `KB_JOB_QUEUE_MAX`           | `queue_max`        | 50      |

use thiserror::Error;
use tracing::warn;

pub const ENV_TENANT_CONCURRENCY: &str = "KB_JOB_TENANT_CONCURRENCY";
pub const ENV_GLOBAL_CONCURRENCY: &str = "KB_JOB_GLOBAL_CONCURRENCY";
pub const ENV_QUEUE_MAX: &str = "KB_JOB_QUEUE_MAX";

/// Configuration error. Raised at startup, never at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Limits enforced by the admission controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Maximum jobs running at once for a single tenant.
    pub per_tenant_limit: usize,
    /// Maximum jobs running at once across all tenants.
    pub global_limit: usize,
    /// Maximum jobs waiting in a single tenant's queue.
    pub queue_max: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            per_tenant_limit: 1,
            global_limit: 4,
            queue_max: 50,
        }
    }
}

impl AdmissionConfig {
    pub fn with_per_tenant_limit(mut self, limit: usize) -> Self {
        self.per_tenant_limit = limit;
        self
    }

    pub fn with_global_limit(mut self, limit: usize) -> Self {
        self.global_limit = limit;
        self
    }

    pub fn with_queue_max(mut self, max: usize) -> Self {
        self.queue_max = max;
        self
    }

    /// Load from process environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary variable lookup (unset or blank means default).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            per_tenant_limit: read_var(&lookup, ENV_TENANT_CONCURRENCY, defaults.per_tenant_limit)?,
            global_limit: read_var(&lookup, ENV_GLOBAL_CONCURRENCY, defaults.global_limit)?,
            queue_max: read_var(&lookup, ENV_QUEUE_MAX, defaults.queue_max)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every limit is at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_tenant_limit == 0 {
            return Err(ConfigError::Zero {
                field: "per_tenant_limit",
            });
        }
        if self.global_limit == 0 {
            return Err(ConfigError::Zero {
                field: "global_limit",
            });
        }
        if self.queue_max == 0 {
            return Err(ConfigError::Zero { field: "queue_max" });
        }

        if self.per_tenant_limit > self.global_limit {
            warn!(
                per_tenant_limit = self.per_tenant_limit,
                global_limit = self.global_limit,
                "per-tenant limit exceeds global limit; effective per-tenant limit is the global limit"
            );
        }
        Ok(())
    }
}

fn read_var<F>(lookup: &F, var: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse::<usize>() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { var, value: raw }),
        },
        _ => Ok(default),
    }
}
