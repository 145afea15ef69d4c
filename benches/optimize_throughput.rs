//! Benchmark: Payload transforms and the optimization round trip

use avatar_asset::lod::default_simplifier;
use avatar_asset::{
    AssetStore, MockBackend, MockSpawner, ModelData, OptimizationEngine, PerformanceTarget,
    StoreConfig, TextureData,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn simplify_benchmark(c: &mut Criterion) {
    let simplifier = default_simplifier();
    let mut group = c.benchmark_group("mesh_simplify");
    for rows in [20u32, 60, 150] {
        let mesh = ModelData::grid(50, rows);
        group.bench_with_input(
            BenchmarkId::from_parameter(mesh.triangle_count()),
            &mesh,
            |b, mesh| b.iter(|| black_box(simplifier.simplify(mesh, 0.5, 0.1))),
        );
    }
    group.finish();
}

fn optimize_asset_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let backend = MockBackend::new();
    let pixels = vec![128u8; 512 * 512 * 4];

    c.bench_function("optimize_texture_512", |b| {
        b.to_async(&rt).iter(|| {
            backend.insert_texture("skin", TextureData::from_rgba8(512, 512, pixels.clone()), 1.0);
            let store = AssetStore::with_spawner(
                backend.clone(),
                StoreConfig::default(),
                MockSpawner::new(),
            );
            let engine = OptimizationEngine::new(store);
            async move {
                black_box(
                    engine
                        .optimize_asset("skin", PerformanceTarget::default())
                        .await
                        .unwrap(),
                )
            }
        })
    });
}

criterion_group!(benches, simplify_benchmark, optimize_asset_benchmark);
criterion_main!(benches);
