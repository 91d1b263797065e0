use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use kbgate_core::{JobMeta, TenantKey};

use crate::result::{JobError, JobOutcome};

/// Boxed future produced by a job body.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<JobOutcome, JobError>> + Send + 'static>>;

/// A tenant-scoped unit of background work.
///
/// The body owns its own retry and timeout behaviour; whoever runs it only
/// observes the final outcome.
#[async_trait]
pub trait BackgroundJob: Send + 'static {
    /// Isolation key the job is admitted under.
    fn tenant_key(&self) -> TenantKey;

    /// Correlation metadata for logs (e.g. ticket id).
    fn meta(&self) -> JobMeta {
        JobMeta::new()
    }

    /// Execute the job. Consumes it: a job runs at most once.
    async fn run(self: Box<Self>) -> Result<JobOutcome, JobError>;
}
