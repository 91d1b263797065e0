//! Admission controller: per-tenant and global concurrency limits over
//! bounded per-tenant FIFO queues.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use kbgate_ai::{BackgroundJob, JobError, JobFuture, JobOutcome};
use kbgate_core::{JobId, JobMeta, TenantKey};

use crate::config::{AdmissionConfig, ConfigError};

use super::stats::{JobMetrics, StatsSnapshot, TenantStats};
use super::types::{JobFn, PendingJob, ReadyJob, TenantState};

/// Startup error building a [`JobQueue`].
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid admission config: {0}")]
    Config(#[from] ConfigError),

    #[error("job queue must be created inside a tokio runtime")]
    NoRuntime,
}

/// Handle to the admission controller.
///
/// Cheap to clone; every clone drives the same queues and counters.
#[derive(Clone)]
pub struct JobQueue {
    shared: Arc<Shared>,
}

struct Shared {
    config: AdmissionConfig,
    runtime: Handle,
    state: Mutex<QueueState>,
    idle: Notify,
}

/// Everything the coordinator owns. Only touched under `Shared::state`.
#[derive(Default)]
struct QueueState {
    global_running: usize,
    metrics: JobMetrics,
    tenants: HashMap<TenantKey, TenantState>,
    /// Tenant keys in creation order (drain scan order).
    order: Vec<TenantKey>,
}

impl JobQueue {
    /// Build a queue bound to the current tokio runtime.
    pub fn new(config: AdmissionConfig) -> Result<Self, QueueError> {
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    /// Build a queue that spawns job bodies on `runtime`.
    pub fn with_runtime(config: AdmissionConfig, runtime: Handle) -> Result<Self, QueueError> {
        config.validate()?;

        info!(
            per_tenant_limit = config.per_tenant_limit,
            global_limit = config.global_limit,
            queue_max = config.queue_max,
            "job queue initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                runtime,
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.shared.config
    }

    /// Submit a job body for `tenant`. Fire-and-forget.
    ///
    /// Returns immediately. The job either starts now, waits in the tenant
    /// queue, or is dropped because the queue is full; the outcome is only
    /// visible through logs and [`stats`](Self::stats).
    pub fn submit<F, Fut>(&self, tenant: impl Into<TenantKey>, job_fn: F, meta: JobMeta)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<JobOutcome, JobError>> + Send + 'static,
    {
        let job_fn: JobFn = Box::new(move || -> JobFuture { Box::pin(job_fn()) });
        self.admit(tenant.into(), PendingJob::new(job_fn, meta));
    }

    /// Submit a [`BackgroundJob`]; tenant and metadata come from the job.
    pub fn submit_job<J: BackgroundJob>(&self, job: J) {
        let tenant = job.tenant_key();
        let meta = job.meta();
        let job = Box::new(job);
        let job_fn: JobFn = Box::new(move || -> JobFuture { job.run() });
        self.admit(tenant, PendingJob::new(job_fn, meta));
    }

    /// Consistent snapshot of counters and per-tenant occupancy.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.lock_state().snapshot()
    }

    /// Wait until nothing is running and every tenant queue is empty.
    ///
    /// Jobs submitted while waiting extend the wait.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            let mut notified = std::pin::pin!(notified);
            notified.as_mut().enable();

            let idle = self.shared.lock_state().is_idle();
            if idle {
                return;
            }
            notified.await;
        }
    }

    fn admit(&self, tenant: TenantKey, job: PendingJob) {
        let config = &self.shared.config;
        let mut ready = Vec::new();
        {
            let mut state = self.shared.lock_state();
            let queued = state.tenant_mut(&tenant).queue.len();

            if queued >= config.queue_max {
                state.metrics.dropped += 1;
                warn!(
                    tenant = %tenant,
                    job_id = %job.id,
                    meta = %job.meta,
                    queued,
                    queue_max = config.queue_max,
                    "tenant queue full; dropping job"
                );
                return;
            }

            state.metrics.enqueued += 1;
            info!(
                tenant = %tenant,
                job_id = %job.id,
                meta = %job.meta,
                queued = queued + 1,
                global_running = state.global_running,
                "job enqueued"
            );
            state.tenant_mut(&tenant).queue.push_back(job);
            state.drain_tenant(&tenant, config, &mut ready);
        }
        self.shared.spawn_all(ready);
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // Job bodies never run under this lock, so poisoning cannot leave
        // the counters half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_all(self: &Arc<Self>, ready: Vec<ReadyJob>) {
        for job in ready {
            debug!(
                tenant = %job.tenant,
                job_id = %job.job.id,
                meta = %job.job.meta,
                waited_ms = duration_ms(job.started_at.duration_since(job.job.enqueued_at)),
                "job started"
            );
            self.runtime.spawn(Arc::clone(self).run_job(job));
        }
    }

    async fn run_job(self: Arc<Self>, ready: ReadyJob) {
        let ReadyJob {
            tenant,
            job,
            started_at,
        } = ready;
        let PendingJob {
            id, meta, job_fn, ..
        } = job;

        // The body gets its own task so a panic is contained and still
        // reaches the bookkeeping below.
        let body = self.runtime.spawn(async move { job_fn().await });
        let result = match body.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(JobError::Panicked(panic_message(err.into_panic()))),
            Err(err) => Err(JobError::Aborted(err.to_string())),
        };

        self.finish(&tenant, id, &meta, result, started_at.elapsed());
    }

    fn finish(
        self: &Arc<Self>,
        tenant: &TenantKey,
        id: JobId,
        meta: &JobMeta,
        result: Result<JobOutcome, JobError>,
        elapsed: Duration,
    ) {
        let duration_ms = duration_ms(elapsed);
        let mut ready = Vec::new();
        let idle = {
            let mut state = self.lock_state();
            match result {
                Ok(JobOutcome::Skipped { reason }) => {
                    state.metrics.completed += 1;
                    state.metrics.suppressed += 1;
                    info!(
                        tenant = %tenant,
                        job_id = %id,
                        meta = %meta,
                        reason = reason.as_deref(),
                        duration_ms,
                        "job skipped; nothing to do"
                    );
                }
                Ok(JobOutcome::Completed { artifact_id }) => {
                    state.metrics.completed += 1;
                    info!(
                        tenant = %tenant,
                        job_id = %id,
                        meta = %meta,
                        artifact_id = artifact_id.as_deref(),
                        duration_ms,
                        "job completed"
                    );
                }
                Err(err) => {
                    state.metrics.failed += 1;
                    warn!(
                        tenant = %tenant,
                        job_id = %id,
                        meta = %meta,
                        error = %err,
                        error_kind = err.as_label(),
                        duration_ms,
                        "job failed"
                    );
                }
            }

            state.release(tenant);
            state.drain_tenant(tenant, &self.config, &mut ready);
            state.drain_all(&self.config, &mut ready);
            state.is_idle()
        };

        if idle {
            self.idle.notify_waiters();
        }
        self.spawn_all(ready);
    }
}

impl QueueState {
    fn tenant_mut(&mut self, key: &TenantKey) -> &mut TenantState {
        if !self.tenants.contains_key(key) {
            self.order.push(key.clone());
        }
        self.tenants.entry(key.clone()).or_default()
    }

    fn release(&mut self, key: &TenantKey) {
        if let Some(tenant) = self.tenants.get_mut(key) {
            tenant.running = tenant.running.saturating_sub(1);
        }
        self.global_running = self.global_running.saturating_sub(1);
    }

    fn drain_tenant(&mut self, key: &TenantKey, config: &AdmissionConfig, ready: &mut Vec<ReadyJob>) {
        let QueueState {
            global_running,
            metrics,
            tenants,
            ..
        } = self;
        if let Some(tenant) = tenants.get_mut(key) {
            start_queued(key, tenant, global_running, metrics, config, ready);
        }
    }

    /// Offer free global capacity to every tenant, in creation order.
    fn drain_all(&mut self, config: &AdmissionConfig, ready: &mut Vec<ReadyJob>) {
        let QueueState {
            global_running,
            metrics,
            tenants,
            order,
        } = self;
        for key in order.iter() {
            if *global_running >= config.global_limit {
                break;
            }
            if let Some(tenant) = tenants.get_mut(key) {
                start_queued(key, tenant, global_running, metrics, config, ready);
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.global_running == 0 && self.tenants.values().all(TenantState::is_idle)
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            global_running: self.global_running,
            metrics: self.metrics,
            tenants: self
                .tenants
                .iter()
                .map(|(key, tenant)| {
                    (
                        key.clone(),
                        TenantStats {
                            running: tenant.running,
                            queued: tenant.queue.len(),
                        },
                    )
                })
                .collect(),
            captured_at: Utc::now(),
        }
    }
}

/// Pop jobs off one tenant queue (oldest first) while both limits have room.
fn start_queued(
    key: &TenantKey,
    tenant: &mut TenantState,
    global_running: &mut usize,
    metrics: &mut JobMetrics,
    config: &AdmissionConfig,
    ready: &mut Vec<ReadyJob>,
) {
    while tenant.running < config.per_tenant_limit && *global_running < config.global_limit {
        let Some(job) = tenant.queue.pop_front() else {
            break;
        };
        tenant.running += 1;
        *global_running += 1;
        metrics.started += 1;
        ready.push(ReadyJob {
            tenant: key.clone(),
            job,
            started_at: Instant::now(),
        });
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    fn config(per_tenant: usize, global: usize, queue_max: usize) -> AdmissionConfig {
        AdmissionConfig::default()
            .with_per_tenant_limit(per_tenant)
            .with_global_limit(global)
            .with_queue_max(queue_max)
    }

    /// Job that finishes when the returned sender fires.
    fn gated() -> (
        oneshot::Sender<()>,
        impl FnOnce() -> JobFuture + Send + 'static,
    ) {
        let (tx, rx) = oneshot::channel::<()>();
        let job = move || -> JobFuture {
            Box::pin(async move {
                let _ = rx.await;
                Ok(JobOutcome::completed())
            })
        };
        (tx, job)
    }

    #[test]
    fn new_outside_runtime_is_rejected() {
        let err = JobQueue::new(AdmissionConfig::default()).unwrap_err();
        assert!(matches!(err, QueueError::NoRuntime));
    }

    #[tokio::test]
    async fn invalid_config_fails_at_construction() {
        let err = JobQueue::new(config(1, 0, 5)).unwrap_err();
        assert!(matches!(
            err,
            QueueError::Config(ConfigError::Zero { field: "global_limit" })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_with_free_slot_counts_as_running() {
        let queue = JobQueue::new(config(1, 4, 2)).unwrap();
        let (release, job) = gated();

        queue.submit("acme", job, JobMeta::new());

        let stats = queue.stats();
        assert_eq!(stats.global_running, 1);
        assert_eq!(stats.tenant("acme").running, 1);
        assert_eq!(stats.tenant("acme").queued, 0);
        assert_eq!(stats.metrics.enqueued, 1);
        assert_eq!(stats.metrics.started, 1);

        release.send(()).unwrap();
        queue.wait_idle().await;
        let stats = queue.stats();
        assert_eq!(stats.global_running, 0);
        assert_eq!(stats.metrics.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_while_tenant_saturated_counts_as_queued() {
        let queue = JobQueue::new(config(1, 4, 2)).unwrap();
        let (release_first, first) = gated();
        let (release_second, second) = gated();

        queue.submit("acme", first, JobMeta::new());
        queue.submit("acme", second, JobMeta::new().with("ticket_id", 2));

        let acme = queue.stats().tenant("acme");
        assert_eq!((acme.running, acme.queued), (1, 1));

        release_first.send(()).unwrap();
        while queue.stats().tenant("acme").queued != 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.stats().tenant("acme").running, 1);

        release_second.send(()).unwrap();
        queue.wait_idle().await;
        assert_eq!(queue.stats().metrics.completed, 2);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_without_work() {
        let queue = JobQueue::new(AdmissionConfig::default()).unwrap();
        queue.wait_idle().await;
        assert!(queue.stats().tenants.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_controller() {
        let queue = JobQueue::new(config(1, 1, 5)).unwrap();
        let other = queue.clone();
        let (release, job) = gated();

        queue.submit("acme", job, JobMeta::new());
        other.submit(
            "globex",
            || async { Ok::<_, JobError>(JobOutcome::completed()) },
            JobMeta::new(),
        );

        let stats = other.stats();
        assert_eq!(stats.global_running, 1);
        assert_eq!(stats.tenant("globex").queued, 1);

        release.send(()).unwrap();
        other.wait_idle().await;
        assert_eq!(queue.stats().metrics.completed, 2);
    }

    struct SkipIfDuplicate {
        ticket: u64,
    }

    #[async_trait]
    impl BackgroundJob for SkipIfDuplicate {
        fn tenant_key(&self) -> TenantKey {
            TenantKey::from("acme")
        }

        fn meta(&self) -> JobMeta {
            JobMeta::new().with("ticket_id", self.ticket)
        }

        async fn run(self: Box<Self>) -> Result<JobOutcome, JobError> {
            Ok(JobOutcome::skipped("article already exists"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn background_job_skips_are_counted_as_suppressed() {
        let queue = JobQueue::new(AdmissionConfig::default()).unwrap();
        queue.submit_job(SkipIfDuplicate { ticket: 9 });
        queue.wait_idle().await;

        let metrics = queue.stats().metrics;
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.suppressed, 1);
        assert_eq!(metrics.failed, 0);
    }
}
