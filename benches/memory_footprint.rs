//! Benchmark: Admission and eviction under a tight memory ceiling

use avatar_asset::{
    AssetStore, CachingStrategy, MockBackend, MockSpawner, Priority, StoreConfig, TextureData,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn memory_footprint_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MockBackend::new();
    for i in 0..32 {
        backend.insert_texture(format!("tex{i}"), TextureData::rgba8(512, 512), 8.0);
    }

    c.bench_function("evicting_load_cycle", |b| {
        let store = AssetStore::with_spawner(
            backend.clone(),
            StoreConfig::default()
                .with_max_memory_mb(64.0)
                .with_strategy(CachingStrategy::Conservative),
            MockSpawner::new(),
        );
        let mut next = 0usize;
        b.to_async(&rt).iter(|| {
            let id = format!("tex{}", next % 32);
            next += 1;
            let store = store.clone();
            async move { black_box(store.load(&id, Priority::Normal).await.unwrap()) }
        })
    });

    c.bench_function("cleanup_pass", |b| {
        let store = AssetStore::with_spawner(
            backend.clone(),
            StoreConfig::default()
                .with_max_memory_mb(320.0)
                .with_auto_cleanup(false),
            MockSpawner::new(),
        );
        b.iter(|| {
            rt.block_on(async {
                for i in 0..32 {
                    store.load(&format!("tex{i}"), Priority::Normal).await.unwrap();
                }
            });
            black_box(store.cleanup())
        })
    });
}

criterion_group!(benches, memory_footprint_benchmark);
criterion_main!(benches);
