//! Integration tests for the optimization engine

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use avatar_asset::{
    AnimationChannel, AnimationData, AssetError, AssetEvent, AssetStore, ChannelProperty,
    DefaultSimplifier, EventKind, Keyframe, MeshSimplifier, MockBackend, MockSpawner, ModelData,
    OptimizationEngine, OptimizationKind, PerformanceTarget, Priority, RecommendationKind,
    StoreConfig, TextureData, TextureFormat, VertexFormat,
};
use glam::Vec4;
use parking_lot::Mutex;

fn engine(backend: &MockBackend) -> OptimizationEngine<MockSpawner> {
    let store =
        AssetStore::with_spawner(backend.clone(), StoreConfig::default(), MockSpawner::new());
    OptimizationEngine::new(store)
}

/// Clustering simplifier that sleeps first and tracks how many run at once
#[derive(Clone, Default)]
struct SlowSimplifier {
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

impl SlowSimplifier {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl MeshSimplifier for SlowSimplifier {
    fn simplify(&self, model: &ModelData, target_ratio: f32, max_error: f32) -> ModelData {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        DefaultSimplifier::new().simplify(model, target_ratio, max_error)
    }

    fn box_clone(&self) -> Box<dyn MeshSimplifier> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Engine on the Tokio runtime with dense meshes resident under `ids`
async fn slow_engine(ids: &[&str], simplifier: &SlowSimplifier) -> OptimizationEngine {
    let backend = MockBackend::new();
    for id in ids {
        backend.insert_model(*id, ModelData::grid(50, 150), 24.0);
    }
    let store = AssetStore::new(backend, StoreConfig::default());
    for id in ids {
        store.load(id, Priority::Normal).await.unwrap();
    }
    let engine = OptimizationEngine::new(store);
    engine.set_simplifier(Box::new(simplifier.clone()));
    engine
}

async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..150 {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn walk_cycle(keys: usize) -> AnimationData {
    let keyframes = (0..keys)
        .map(|i| {
            let t = i as f32 / (keys - 1) as f32;
            Keyframe {
                time: t,
                value: Vec4::new(t * 2.0, 0.0, 0.0, 0.0),
            }
        })
        .collect();
    AnimationData {
        name: Some("walk".to_string()),
        duration: 1.0,
        channels: vec![AnimationChannel {
            target_node: 0,
            property: ChannelProperty::Translation,
            keyframes,
        }],
        compressed: false,
    }
}

#[tokio::test]
async fn test_large_texture_is_compressed_and_resized() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(2048, 2048), 16.0);
    let engine = engine(&backend);
    let optimized = Arc::new(Mutex::new(Vec::new()));
    let optimized_clone = Arc::clone(&optimized);
    engine
        .store()
        .events()
        .subscribe(EventKind::AssetOptimized, move |event| {
            optimized_clone.lock().push(event.clone())
        });

    let target = PerformanceTarget {
        max_memory_mb: 200.0,
        ..PerformanceTarget::default()
    };
    let result = engine.optimize_asset("skin", target).await.unwrap();

    assert!(result.success);
    assert_eq!(
        result.optimizations,
        vec![
            OptimizationKind::TextureCompression,
            OptimizationKind::TextureResize
        ]
    );
    assert_eq!(result.applied(), vec!["texture_compression", "texture_resize"]);
    assert!(result.memory_saved_mb > 0.0);
    assert!(result.compression_ratio < 1.0);

    let asset = engine.store().get("skin").unwrap();
    let texture = asset.payload.as_texture().unwrap();
    assert_eq!((texture.width, texture.height), (1024, 1024));
    assert_eq!(texture.format, TextureFormat::Rgba4Unorm);
    assert!(asset.is_optimized());
    assert!((asset.footprint_mb - 2.0).abs() < 1e-9);
    assert!((engine.store().memory_stats().used_mb - 2.0).abs() < 1e-9);
    assert_eq!(optimized.lock().len(), 1);
}

#[tokio::test]
async fn test_dense_mesh_is_simplified() {
    let backend = MockBackend::new();
    let mesh = ModelData::grid(50, 150);
    assert_eq!(mesh.triangle_count(), 15_000);
    backend.insert_model("body", mesh, 24.0);
    let engine = engine(&backend);

    let result = engine
        .optimize_asset("body", PerformanceTarget::default())
        .await
        .unwrap();

    assert_eq!(
        result.optimizations,
        vec![
            OptimizationKind::MeshSimplification,
            OptimizationKind::VertexCompression
        ]
    );
    let asset = engine.store().get("body").unwrap();
    let model = asset.payload.as_model().unwrap();
    assert!(model.triangle_count() < 15_000);
    assert_eq!(model.vertex_format, VertexFormat::Quantized16);
    assert!(asset.footprint_mb < 24.0);
}

#[tokio::test]
async fn test_optimization_never_grows_memory() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(512, 512), 1.0);
    backend.insert_model("body", ModelData::grid(20, 20), 0.5);
    backend.insert_animation("walk", walk_cycle(30), 0.2);
    let engine = engine(&backend);
    let ids = ["skin", "body", "walk"];
    for id in ids {
        engine.store().load(id, Priority::Normal).await.unwrap();
    }

    for pass in 0..2 {
        for id in ids {
            let before = engine.store().get(id).unwrap().footprint_mb;
            let used_before = engine.store().memory_stats().used_mb;

            let result = engine
                .optimize_asset(id, PerformanceTarget::default())
                .await
                .unwrap();

            let after = engine.store().get(id).unwrap().footprint_mb;
            assert!(after <= before, "{id} grew on pass {pass}");
            assert!(engine.store().memory_stats().used_mb <= used_before + 1e-9);
            assert!(result.memory_saved_mb >= 0.0);
            assert!(result.compression_ratio <= 1.0);
            if pass == 1 {
                assert_eq!(result.memory_saved_mb, 0.0, "{id} shrank twice");
            }
        }
    }
    assert_eq!(engine.get_optimization_report().optimizations_completed, 3);
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(1024, 1024), 4.0);
    backend.insert_animation("walk", walk_cycle(12), 0.1);
    let engine = engine(&backend);

    let ids: Vec<String> = ["skin", "missing", "walk"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let batch = engine
        .batch_optimize_assets(&ids, PerformanceTarget::default())
        .await;

    assert_eq!(batch.total, 3);
    assert_eq!(batch.successful, 2);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].0, "missing");
    assert_eq!(
        batch.errors[0].1,
        AssetError::NotFound("missing".to_string())
    );
    let saved: f64 = batch.results.iter().map(|r| r.memory_saved_mb).sum();
    assert!((batch.total_memory_saved_mb - saved).abs() < 1e-9);
    assert!(batch.total_memory_saved_mb > 0.0);
}

#[tokio::test]
async fn test_invalid_target_is_rejected() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(64, 64), 1.0);
    let engine = engine(&backend);

    let target = PerformanceTarget {
        target_fps: 0.0,
        ..PerformanceTarget::default()
    };
    assert!(matches!(
        engine.optimize_asset("skin", target).await,
        Err(AssetError::InvalidTarget(_))
    ));
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_queue_orders_by_priority() {
    let backend = MockBackend::new();
    for id in ["low", "critical", "normal"] {
        backend.insert_texture(id, TextureData::rgba8(256, 256), 1.0);
    }
    let engine = engine(&backend);
    for id in ["low", "critical", "normal"] {
        engine.store().load(id, Priority::Normal).await.unwrap();
    }

    let low = engine.queue_asset_optimization("low", Priority::Low);
    engine.queue_asset_optimization("critical", Priority::Critical);
    engine.queue_asset_optimization("normal", Priority::Normal);
    assert_eq!(engine.queue_asset_optimization("low", Priority::Low), low);

    let status = engine.get_queue_status();
    assert_eq!(status.total_tasks, 3);
    assert_eq!(status.priority_breakdown.critical, 1);
    assert_eq!(status.priority_breakdown.high, 0);
    assert_eq!(status.priority_breakdown.normal, 1);
    assert_eq!(status.priority_breakdown.low, 1);
    assert_eq!(status.estimated_processing_time, Duration::from_millis(750));
    assert!(!status.is_processing);
    assert_eq!(status.in_flight, None);

    let mut order = Vec::new();
    while let Some(outcome) = engine.process_next_task().await {
        order.push(outcome.unwrap().unwrap().asset_id);
    }
    assert_eq!(order, vec!["critical", "normal", "low"]);
    assert_eq!(engine.get_queue_status().total_tasks, 0);
}

#[tokio::test]
async fn test_background_worker_drains_queue() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(1024, 1024), 4.0);
    let store = AssetStore::new(backend.clone(), StoreConfig::default());
    let engine = OptimizationEngine::new(store.clone());
    store.load("skin", Priority::Normal).await.unwrap();

    assert!(engine.start_optimization());
    assert!(!engine.start_optimization());
    engine.queue_asset_optimization("skin", Priority::High);

    let mut optimized = false;
    for _ in 0..100 {
        if store.get("skin").is_some_and(|a| a.is_optimized()) {
            optimized = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(optimized);
    assert!(engine.is_running());

    engine.stop_optimization();
    assert!(!engine.is_running());
    engine.shutdown();
}

#[tokio::test]
async fn test_co_accessed_assets_are_recommended_for_preload() {
    let backend = MockBackend::new();
    backend.insert_model("head", ModelData::grid(2, 2), 1.0);
    backend.insert_model("hair", ModelData::grid(2, 2), 1.0);
    let engine = engine(&backend);

    for _ in 0..4 {
        engine.store().load("head", Priority::Normal).await.unwrap();
        engine.store().load("hair", Priority::Normal).await.unwrap();
    }

    let recommendations = engine.get_caching_recommendations();
    let preload = recommendations
        .iter()
        .find(|r| r.kind == RecommendationKind::Preload)
        .expect("co-accessed pair should be recommended");
    assert_eq!(preload.asset_ids, vec!["hair", "head"]);
}

#[tokio::test]
async fn test_strategy_switch_is_visible_to_store() {
    let backend = MockBackend::new();
    let engine = engine(&backend);

    let strategy = engine.apply_caching_strategy_named("Memory_Optimized").unwrap();
    assert_eq!(engine.store().policy().strategy(), strategy);
    assert_eq!(engine.store().policy().current().pressure_threshold, 0.75);
    assert!(matches!(
        engine.apply_caching_strategy_named("reckless"),
        Err(AssetError::UnknownStrategy(_))
    ));
    assert_eq!(engine.store().policy().strategy(), strategy);
}

#[tokio::test]
async fn test_report_reflects_completed_work() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(1024, 1024), 4.0);
    let engine = engine(&backend);
    let events = Arc::new(Mutex::new(0));
    let events_clone = Arc::clone(&events);
    engine.store().events().subscribe_all(move |event| {
        if matches!(event, AssetEvent::AssetOptimized { .. }) {
            *events_clone.lock() += 1;
        }
    });

    engine
        .optimize_asset("skin", PerformanceTarget::default())
        .await
        .unwrap();
    engine.queue_asset_optimization("skin", Priority::Low);

    let report = engine.get_optimization_report();
    assert_eq!(report.optimizations_completed, 1);
    assert_eq!(report.queued_optimizations, 1);
    assert!(report.average_compression_ratio < 1.0);
    assert!((0.0..=1.0).contains(&report.system_health));
    assert_eq!(*events.lock(), 1);

    let bottlenecks = engine.get_performance_bottlenecks();
    assert!((0.0..=1.0).contains(&bottlenecks.severity));
}

#[tokio::test]
async fn test_memory_optimization_without_pressure_succeeds() {
    let backend = MockBackend::new();
    backend.insert_texture("skin", TextureData::rgba8(256, 256), 1.0);
    let engine = engine(&backend);
    engine.store().load("skin", Priority::Normal).await.unwrap();

    let result = engine.perform_memory_optimization();
    assert!(result.success);
    assert_eq!(result.assets_unloaded, 0);
    assert_eq!(result.memory_freed_mb, 0.0);
    assert_eq!(result.optimizations_queued, 1);
}

#[tokio::test]
async fn test_slow_transform_exceeds_processing_time() {
    let slow = SlowSimplifier::new(Duration::from_millis(300));
    let engine = slow_engine(&["body"], &slow).await;

    let target = PerformanceTarget {
        max_processing_time: Duration::from_millis(50),
        ..PerformanceTarget::default()
    };
    let err = engine.optimize_asset("body", target).await.unwrap_err();

    assert!(matches!(
        err,
        AssetError::OptimizationFailed { ref id, .. } if id == "body"
    ));
    let asset = engine.store().get("body").unwrap();
    assert!(!asset.is_optimized());
    assert_eq!(asset.footprint_mb, 24.0);
    assert_eq!(engine.get_optimization_report().optimizations_completed, 0);
}

#[tokio::test]
async fn test_unload_during_transform_discards_result() {
    let slow = SlowSimplifier::new(Duration::from_millis(200));
    let engine = slow_engine(&["body"], &slow).await;
    let optimized = Arc::new(AtomicUsize::new(0));
    let optimized_clone = Arc::clone(&optimized);
    engine
        .store()
        .events()
        .subscribe(EventKind::AssetOptimized, move |_| {
            optimized_clone.fetch_add(1, Ordering::SeqCst);
        });

    let running = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .optimize_asset("body", PerformanceTarget::default())
                .await
        })
    };
    assert!(wait_until(|| slow.started.load(Ordering::SeqCst) == 1).await);
    assert!(engine.store().unload("body"));

    let result = running.await.unwrap();
    assert!(matches!(
        result,
        Err(AssetError::OptimizationFailed { ref id, .. }) if id == "body"
    ));
    assert!(!engine.store().is_resident("body"));
    assert_eq!(engine.store().memory_stats().used_mb, 0.0);
    assert_eq!(optimized.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_worker_restart_keeps_one_task_in_flight() {
    let slow = SlowSimplifier::new(Duration::from_millis(150));
    let engine = slow_engine(&["a", "b", "c"], &slow).await;
    let store = engine.store().clone();
    let optimized = |id: &str| store.get(id).is_some_and(|a| a.is_optimized());

    // Restart before the idle worker has observed the stop
    assert!(engine.start_optimization());
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.stop_optimization();
    assert!(engine.start_optimization());
    engine.queue_asset_optimization("a", Priority::High);
    engine.queue_asset_optimization("b", Priority::High);

    assert!(wait_until(|| optimized("a") && optimized("b")).await);
    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    assert_eq!(slow.started.load(Ordering::SeqCst), 2);

    // Restart after the worker has exited
    engine.stop_optimization();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!engine.is_running());
    assert!(engine.start_optimization());
    engine.queue_asset_optimization("c", Priority::Normal);

    assert!(wait_until(|| optimized("c")).await);
    assert_eq!(slow.peak.load(Ordering::SeqCst), 1);
    engine.shutdown();
}
