//! Replays a burst of ticket-resolved triggers through the admission
//! controller and prints the final stats snapshot as JSON.

mod tickets;

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use kbgate_infra::{AdmissionConfig, JobQueue};

use crate::tickets::{BurstConfig, KbArticleJob};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kbgate_observability::init();

    let config = AdmissionConfig::from_env().context("invalid admission config")?;
    let burst = BurstConfig::from_env().context("invalid burst config")?;
    let queue = JobQueue::new(config)?;

    info!(
        tickets = burst.tickets,
        tenants = burst.tenants,
        fail_every = burst.fail_every,
        "replaying ticket resolutions"
    );

    let reporter = tokio::spawn(report_stats(queue.clone(), Duration::from_millis(250)));

    for ticket in burst.resolved_tickets() {
        queue.submit_job(KbArticleJob::new(ticket));
    }

    queue.wait_idle().await;
    reporter.abort();

    println!("{}", serde_json::to_string_pretty(&queue.stats())?);
    Ok(())
}

async fn report_stats(queue: JobQueue, every: Duration) {
    let mut tick = tokio::time::interval(every);
    loop {
        tick.tick().await;
        let stats = queue.stats();
        match serde_json::to_string(&stats) {
            Ok(json) => info!(stats = %json, "job queue stats"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize stats"),
        }
    }
}
