use std::sync::Arc;
use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use futures::stream::FuturesUnordered;
use futures::stream::StreamExt;
use http::Request;
use http::Response;
use pace_limit::LimiterConfig;
use pace_limit::Registry;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::service_fn;
use tower::util::BoxCloneSyncService;
use tower_pace::AdmissionLayer;

// --- HELPERS & TYPES ---

type BenchService = BoxCloneSyncService<Request<String>, Response<String>, BoxError>;

async fn noop_handler(_req: Request<String>) -> Result<Response<String>, BoxError> {
    Ok(Response::new("ok".to_string()))
}

fn tenant_header(req: &Request<String>) -> Option<String> {
    req.headers()
        .get("x-app-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn request(tenant: &str) -> Request<String> {
    Request::builder()
        .header("x-app-id", tenant)
        .body("test".to_string())
        .unwrap()
}

/// Generic runner for single-call overhead benchmarks
fn bench_overhead(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let mut s = svc.clone();
            async move {
                let res = s.ready().await.unwrap().call(request("bench")).await;
                black_box(res)
            }
        });
    });
}

/// Generic runner for burst/contention benchmarks, spread over `tenants`
fn bench_burst(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
    burst_size: usize,
    tenants: usize,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let s = svc.clone();
            async move {
                let mut futures = FuturesUnordered::new();
                for i in 0..burst_size {
                    let mut local_svc = s.clone();
                    let tenant = format!("tenant-{}", i % tenants);
                    futures.push(async move {
                        local_svc.ready().await.unwrap().call(request(&tenant)).await
                    });
                }
                while let Some(res) = futures.next().await {
                    let _ = black_box(res);
                }
            }
        });
    });
}

// --- MAIN BENCHMARK ---

fn bench_all_scenarios(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap();
    let _guard = rt.enter();

    let burst_size = 1000;

    // Use a massive rate so we measure the overhead of admission,
    // not the time spent sleeping.
    let registry = Arc::new(
        Registry::new(
            std::iter::empty(),
            LimiterConfig::new(1_000_000_000, Duration::from_secs(1), 1_000_000),
        )
        .unwrap(),
    );

    let scenarios: Vec<(&str, BenchService)> = vec![
        (
            "no_admission",
            BoxCloneSyncService::new(ServiceBuilder::new().service(service_fn(noop_handler))),
        ),
        (
            "admission",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(AdmissionLayer::new(registry.clone(), tenant_header))
                    .service(service_fn(noop_handler)),
            ),
        ),
        (
            "admission_with_timeout",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(
                        AdmissionLayer::new(registry.clone(), tenant_header)
                            .with_timeout(Duration::from_millis(100)),
                    )
                    .service(service_fn(noop_handler)),
            ),
        ),
    ];

    let mut overhead_group = c.benchmark_group("Middleware Overhead");
    for (id, svc) in &scenarios {
        bench_overhead(&mut overhead_group, &rt, id, svc.clone());
    }
    overhead_group.finish();

    let mut contention_group = c.benchmark_group("High Contention (1000 Tasks)");
    for (id, svc) in &scenarios {
        bench_burst(&mut contention_group, &rt, id, svc.clone(), burst_size, 1);
    }
    contention_group.finish();

    let mut tenants_group = c.benchmark_group("Many Tenants (1000 Tasks, 100 Tenants)");
    for (id, svc) in &scenarios {
        bench_burst(&mut tenants_group, &rt, id, svc.clone(), burst_size, 100);
    }
    tenants_group.finish();
}

criterion_group!(benches, bench_all_scenarios);
criterion_main!(benches);
