//! Write-behind throughput benchmarks
//!
//! - update: staging insert plus enqueue, persisted by the background queue
//! - get: staged hit, and persisted hit that falls through to the store
//! - bounded staging: updates that evict and persist inline
//!
//! Run with: cargo bench --bench spool_throughput

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::runtime::Runtime;

use spooltier::cache::{AuxiliaryCache, CacheElement, MemoryStore, SpoolSettings, WriteBehindCache};

const SIZE_1KB: usize = 1024;
const SIZE_64KB: usize = 64 * 1024;

/// Generate semi-realistic payload (not just zeros)
fn generate_test_data(size: usize) -> Bytes {
    let pattern: Vec<u8> = (0..256).map(|i| i as u8).collect();
    Bytes::from(pattern.iter().cycle().take(size).cloned().collect::<Vec<u8>>())
}

fn create_cache(rt: &Runtime, settings: SpoolSettings) -> WriteBehindCache<MemoryStore> {
    // The persistence queue spawns onto the runtime
    rt.block_on(async { WriteBehindCache::new(settings, MemoryStore::new()) })
}

fn bench_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = create_cache(&rt, SpoolSettings::named("bench"));

    let mut group = c.benchmark_group("update");
    for (name, size) in [("1kb", SIZE_1KB), ("64kb", SIZE_64KB)] {
        let payload = generate_test_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("size", name), &payload, |b, payload| {
            let mut counter = 0u64;
            b.iter(|| {
                let key = format!("update-{}-{:08}", name, counter % 10_000);
                counter = counter.wrapping_add(1);
                let element = CacheElement::new("bench", key, payload.clone());
                rt.block_on(async {
                    cache.update(black_box(element)).await;
                });
            });
        });
    }
    group.finish();

    rt.block_on(async {
        let _ = cache.dispose().await;
    });
}

fn bench_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let slow_store = MemoryStore::new();
    // Keeps writes staged for the whole measurement
    slow_store.set_persist_delay(Some(Duration::from_secs(3600)));
    let staged = rt.block_on(async {
        WriteBehindCache::new(
            SpoolSettings {
                shutdown_spool_time_limit: Duration::from_millis(10),
                ..SpoolSettings::named("staged")
            },
            slow_store,
        )
    });
    let persisted = create_cache(&rt, SpoolSettings::named("persisted"));

    rt.block_on(async {
        for i in 0..1000 {
            let key = format!("key-{:06}", i);
            staged
                .update(CacheElement::new("staged", key.clone(), generate_test_data(SIZE_1KB)))
                .await;
            persisted
                .update(CacheElement::new("persisted", key, generate_test_data(SIZE_1KB)))
                .await;
        }
        while !persisted.is_queue_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let mut group = c.benchmark_group("get");
    for (name, cache) in [("staged_hit", &staged), ("store_hit", &persisted)] {
        group.bench_function(name, |b| {
            let mut counter = 0usize;
            b.iter(|| {
                let key = format!("key-{:06}", counter % 1000);
                counter = counter.wrapping_add(1);
                rt.block_on(async {
                    black_box(cache.get(&key).await);
                });
            });
        });
    }
    group.bench_function("miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(persisted.get("absent").await);
            });
        });
    });
    group.finish();

    rt.block_on(async {
        let _ = staged.dispose().await;
        let _ = persisted.dispose().await;
    });
}

fn bench_bounded_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("bounded_update");
    for capacity in [16i64, 1024] {
        let cache = create_cache(
            &rt,
            SpoolSettings {
                max_purgatory_size: capacity,
                ..SpoolSettings::named("bounded")
            },
        );
        let payload = generate_test_data(SIZE_1KB);
        group.bench_with_input(BenchmarkId::new("capacity", capacity), &payload, |b, payload| {
            let mut counter = 0u64;
            b.iter(|| {
                let key = format!("bounded-{:08}", counter);
                counter = counter.wrapping_add(1);
                let element = CacheElement::new("bounded", key, payload.clone());
                rt.block_on(async {
                    cache.update(black_box(element)).await;
                });
            });
        });
        rt.block_on(async {
            let _ = cache.dispose().await;
        });
    }
    group.finish();
}

criterion_group! {
    name = spool_benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(5))
        .sample_size(100);
    targets = bench_update, bench_get, bench_bounded_update
}

criterion_main!(spool_benches);
