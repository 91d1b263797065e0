use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kbgate_ai::{JobError, JobOutcome};
use kbgate_core::{JobMeta, TenantId, TenantKey};
use kbgate_infra::{AdmissionConfig, JobQueue};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn instant_job() -> impl std::future::Future<Output = Result<JobOutcome, JobError>> {
    async { Ok(JobOutcome::completed()) }
}

fn never_finishing_job() -> impl std::future::Future<Output = Result<JobOutcome, JobError>> {
    std::future::pending()
}

/// Cost of the shed path: tenant slot busy, queue full, every submit drops.
fn bench_submit_when_saturated(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let queue = JobQueue::new(AdmissionConfig::default().with_queue_max(1)).unwrap();
    queue.submit("busy", never_finishing_job, JobMeta::new());
    queue.submit("busy", never_finishing_job, JobMeta::new());

    c.bench_function("submit_dropped_when_saturated", |b| {
        b.iter(|| {
            queue.submit(
                black_box("busy"),
                never_finishing_job,
                JobMeta::new().with("ticket_id", 1),
            );
        });
    });
}

/// End-to-end: enqueue a burst across tenants and wait for it to drain.
fn bench_burst_drain(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("burst_drain");

    for tenants in [1usize, 10, 50] {
        let jobs = 200usize;
        group.throughput(Throughput::Elements(jobs as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tenants), &tenants, |b, &tenants| {
            let keys: Vec<TenantKey> = (0..tenants).map(|_| TenantKey::from(TenantId::new())).collect();
            let queue = {
                let _guard = rt.enter();
                JobQueue::new(
                    AdmissionConfig::default()
                        .with_per_tenant_limit(2)
                        .with_global_limit(8)
                        .with_queue_max(jobs),
                )
                .unwrap()
            };

            b.iter(|| {
                for i in 0..jobs {
                    queue.submit(&keys[i % tenants], instant_job, JobMeta::new());
                }
                rt.block_on(queue.wait_idle());
            });
        });
    }

    group.finish();
}

fn bench_stats_snapshot(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let queue = JobQueue::new(AdmissionConfig::default()).unwrap();
    for _ in 0..100 {
        let key = TenantKey::from(TenantId::new());
        queue.submit(&key, never_finishing_job, JobMeta::new());
        queue.submit(&key, never_finishing_job, JobMeta::new());
    }

    c.bench_function("stats_snapshot_100_tenants", |b| {
        b.iter(|| black_box(queue.stats()));
    });
}

criterion_group!(
    benches,
    bench_submit_when_saturated,
    bench_burst_drain,
    bench_stats_snapshot
);
criterion_main!(benches);
