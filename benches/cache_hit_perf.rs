//! Benchmark: Cache hit performance

use avatar_asset::{AssetStore, MockBackend, MockSpawner, ModelData, Priority, StoreConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn cache_hit_perf_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MockBackend::new();
    for i in 0..64 {
        backend.insert_model(format!("part{i}"), ModelData::grid(8, 8), 1.0);
    }
    let store = AssetStore::with_spawner(backend, StoreConfig::default(), MockSpawner::new());
    rt.block_on(async {
        for i in 0..64 {
            store
                .load(&format!("part{i}"), Priority::Normal)
                .await
                .unwrap();
        }
    });

    c.bench_function("resident_load_hit", |b| {
        let store = &store;
        b.to_async(&rt).iter(|| async move {
            black_box(store.load("part17", Priority::Normal).await.unwrap())
        })
    });

    c.bench_function("cache_hit_rate", |b| {
        b.iter(|| black_box(store.metrics().cache_hit_rate()))
    });

    c.bench_function("memory_stats", |b| b.iter(|| black_box(store.memory_stats())));
}

criterion_group!(benches, cache_hit_perf_benchmark);
criterion_main!(benches);
