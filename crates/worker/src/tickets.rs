//! Simulated ticket-resolution triggers and the KB article job they produce.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use kbgate_ai::{BackgroundJob, JobError, JobOutcome};
use kbgate_core::{JobMeta, TenantId, TenantKey};

/// Shape of the simulated burst, from `KB_WORKER_*` variables.
#[derive(Debug, Clone)]
pub struct BurstConfig {
    pub tickets: u64,
    pub tenants: usize,
    /// Every n-th ticket fails generation (`0` = never).
    pub fail_every: u64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            tickets: 40,
            tenants: 3,
            fail_every: 0,
        }
    }
}

impl BurstConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            tickets: env_or("KB_WORKER_TICKETS", defaults.tickets)?,
            tenants: env_or("KB_WORKER_TENANTS", defaults.tenants)?,
            fail_every: env_or("KB_WORKER_FAIL_EVERY", defaults.fail_every)?,
        };
        anyhow::ensure!(config.tenants > 0, "KB_WORKER_TENANTS must be at least 1");
        Ok(config)
    }

    /// Deterministic ticket stream spread round-robin over the tenants.
    pub fn resolved_tickets(&self) -> Vec<TicketResolved> {
        let tenants: Vec<TenantId> = (0..self.tenants).map(|_| TenantId::new()).collect();
        (1..=self.tickets)
            .map(|n| TicketResolved {
                tenant_id: tenants[(n as usize - 1) % tenants.len()],
                ticket_id: n,
                resolution_notes: if n % 5 == 0 {
                    String::new()
                } else {
                    format!("reset credentials for ticket {n}")
                },
                fail: self.fail_every != 0 && n % self.fail_every == 0,
            })
            .collect()
    }
}

fn env_or<T>(var: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{var}={raw:?} is not valid")),
        _ => Ok(default),
    }
}

/// A ticket was resolved; its resolution may become a KB article.
#[derive(Debug, Clone)]
pub struct TicketResolved {
    pub tenant_id: TenantId,
    pub ticket_id: u64,
    pub resolution_notes: String,
    pub fail: bool,
}

/// Generates a KB article from a resolved ticket (simulated LLM call).
#[derive(Debug)]
pub struct KbArticleJob {
    ticket: TicketResolved,
}

impl KbArticleJob {
    pub fn new(ticket: TicketResolved) -> Self {
        Self { ticket }
    }

    fn generation_time(&self) -> Duration {
        Duration::from_millis(20 + (self.ticket.ticket_id * 37) % 80)
    }
}

#[async_trait]
impl BackgroundJob for KbArticleJob {
    fn tenant_key(&self) -> TenantKey {
        TenantKey::from(self.ticket.tenant_id)
    }

    fn meta(&self) -> JobMeta {
        JobMeta::new()
            .with("ticket_id", self.ticket.ticket_id)
            .with("trigger", "ticket_resolved")
    }

    async fn run(self: Box<Self>) -> Result<JobOutcome, JobError> {
        if self.ticket.resolution_notes.trim().is_empty() {
            return Ok(JobOutcome::skipped("ticket has no resolution notes"));
        }

        tokio::time::sleep(self.generation_time()).await;

        if self.ticket.fail {
            return Err(JobError::failed("llm returned an empty draft"));
        }
        Ok(JobOutcome::artifact(format!("kb-{}", self.ticket.ticket_id)))
    }
}
