//! Queue entry and per-tenant state.

use std::collections::VecDeque;
use std::time::Instant;

use kbgate_ai::JobFuture;
use kbgate_core::{JobId, JobMeta, TenantKey};

/// Deferred job body. Invoked exactly once, when the job is started.
pub type JobFn = Box<dyn FnOnce() -> JobFuture + Send + 'static>;

/// Job waiting in a tenant queue.
///
/// Owns the job body until it is handed to the execution step.
pub(crate) struct PendingJob {
    pub id: JobId,
    pub meta: JobMeta,
    pub job_fn: JobFn,
    pub enqueued_at: Instant,
}

impl PendingJob {
    pub fn new(job_fn: JobFn, meta: JobMeta) -> Self {
        Self {
            id: JobId::new(),
            meta,
            job_fn,
            enqueued_at: Instant::now(),
        }
    }
}

/// Job that has been counted as running and must be spawned.
pub(crate) struct ReadyJob {
    pub tenant: TenantKey,
    pub job: PendingJob,
    pub started_at: Instant,
}

/// Limiter state of one tenant. Created on first submission, never removed.
#[derive(Default)]
pub(crate) struct TenantState {
    pub running: usize,
    pub queue: VecDeque<PendingJob>,
}

impl TenantState {
    pub fn is_idle(&self) -> bool {
        self.running == 0 && self.queue.is_empty()
    }
}
