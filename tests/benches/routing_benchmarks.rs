//! # Quarry Routing Benchmarks
//!
//! Overhead of the routing fan-out on top of the routers it queries:
//!
//! | Benchmark | Measures |
//! |-----------|----------|
//! | `parallel_get_value` | first-hit resolution across N in-memory routers |
//! | `provider_query` | deny filter, dedup and cap over merged provider streams |

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::StreamExt;
use qg_01_content_routing::{
    MemoryRouter, ParallelRouteEntry, ParallelRouter, ProviderQueryLimits, ProviderQueryManager, RoutingBackend,
};
use shared_types::{AddrInfo, ContentId};
use tokio_util::sync::CancellationToken;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn parallel(routers: usize, key: &[u8], cid: &ContentId) -> ParallelRouter {
    let entries = (0..routers)
        .map(|i| {
            let router = Arc::new(MemoryRouter::new());
            router.insert_value(key, format!("value-{i}").into_bytes());
            for p in 0..20 {
                router.insert_provider(
                    cid.clone(),
                    AddrInfo::new(format!("12D3KooWPeer{}", (i * 7 + p) % 50).parse().expect("peer id")),
                );
            }
            ParallelRouteEntry::new(RoutingBackend::full(format!("memory-{i}"), router))
        })
        .collect();
    ParallelRouter::new(entries)
}

fn bench_parallel_get_value(c: &mut Criterion) {
    let rt = runtime();
    let cid = ContentId::raw(b"bench").expect("cid");
    let mut group = c.benchmark_group("qg-01-parallel-get-value");

    for routers in [1usize, 4, 16] {
        let router = parallel(routers, b"/ipns/bench", &cid);
        group.throughput(Throughput::Elements(routers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(routers), &router, |b, router| {
            b.iter(|| {
                rt.block_on(async {
                    use qg_01_content_routing::ValueStore;
                    let ctx = CancellationToken::new();
                    black_box(router.get_value(&ctx, b"/ipns/bench").await.expect("value"))
                })
            })
        });
    }
    group.finish();
}

fn bench_provider_query(c: &mut Criterion) {
    let rt = runtime();
    let cid = ContentId::raw(b"bench").expect("cid");
    let mut group = c.benchmark_group("qg-01-provider-query");

    for cap in [0usize, 10] {
        let backend = RoutingBackend::full("parallel", Arc::new(parallel(8, b"/ipns/bench", &cid)));
        let limits = ProviderQueryLimits {
            max_in_flight: 16,
            max_providers: cap,
            ..Default::default()
        };
        let manager = ProviderQueryManager::new(backend, limits);
        group.bench_with_input(BenchmarkId::new("cap", cap), &manager, |b, manager| {
            b.iter(|| {
                rt.block_on(async {
                    use qg_01_content_routing::ContentDiscovery;
                    let ctx = CancellationToken::new();
                    black_box(manager.find_providers(&ctx, &cid, 0).count().await)
                })
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parallel_get_value, bench_provider_query);
criterion_main!(benches);
