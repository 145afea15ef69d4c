//! Asset optimization engine
//!
//! [`OptimizationEngine`] rewrites resident assets into smaller payloads
//! (texture compression and resizing, mesh simplification, vertex
//! quantization, keyframe reduction), runs a priority-ordered background
//! queue, keeps access statistics for caching advice and reacts to memory
//! pressure reported by the store.

pub mod diagnostics;
pub mod queue;
pub mod stats;
pub mod strategies;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::cache::policy::CachingStrategy;
use crate::cache::AssetStore;
use crate::error::{AssetError, Result};
use crate::events::{AssetEvent, EventKind, SubscriptionId};
use crate::lod::{default_simplifier, MeshSimplifier};
use crate::runtime::{AsyncSpawner, TokioSpawner};
use crate::types::Priority;

use diagnostics::{BottleneckAnalysis, DiagnosticsSnapshot, OptimizationReport};
use queue::{OptimizationQueue, OptimizationTask, QueueStatus};
use stats::{AccessStats, CachingRecommendation};
use strategies::TransformContext;

/// Residents queued by one memory optimization pass
pub const PRESSURE_OPTIMIZATION_BATCH: usize = 5;

/// Named optimization steps, reported in the order they were applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizationKind {
    TextureCompression,
    TextureResize,
    MeshSimplification,
    VertexCompression,
    KeyframeReduction,
}

impl OptimizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextureCompression => "texture_compression",
            Self::TextureResize => "texture_resize",
            Self::MeshSimplification => "mesh_simplification",
            Self::VertexCompression => "vertex_compression",
            Self::KeyframeReduction => "keyframe_reduction",
        }
    }
}

impl std::fmt::Display for OptimizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request optimization target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceTarget {
    pub max_memory_mb: f64,
    pub target_fps: f32,
    pub max_processing_time: Duration,
}

impl Default for PerformanceTarget {
    fn default() -> Self {
        Self {
            max_memory_mb: crate::cache::REFERENCE_MEMORY_MB,
            target_fps: 60.0,
            max_processing_time: Duration::from_secs(5),
        }
    }
}

impl PerformanceTarget {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_memory_mb > 0.0) {
            return Err(AssetError::InvalidTarget(format!(
                "max_memory_mb must be positive, got {}",
                self.max_memory_mb
            )));
        }
        if !(self.target_fps > 0.0) {
            return Err(AssetError::InvalidTarget(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.max_processing_time.is_zero() {
            return Err(AssetError::InvalidTarget(
                "max_processing_time must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Global quality and size limits applied to every optimization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationTargets {
    pub max_memory_mb: f64,
    /// Desired new/original size, in (0, 1]
    pub target_compression_ratio: f32,
    /// Acceptable quality loss, in [0, 1]
    pub max_quality_loss: f32,
}

impl Default for OptimizationTargets {
    fn default() -> Self {
        Self {
            max_memory_mb: crate::cache::REFERENCE_MEMORY_MB,
            target_compression_ratio: 0.5,
            max_quality_loss: 0.1,
        }
    }
}

impl OptimizationTargets {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_memory_mb > 0.0) {
            return Err(AssetError::InvalidTarget(format!(
                "max_memory_mb must be positive, got {}",
                self.max_memory_mb
            )));
        }
        if !(self.target_compression_ratio > 0.0 && self.target_compression_ratio <= 1.0) {
            return Err(AssetError::InvalidTarget(format!(
                "target_compression_ratio must be in (0, 1], got {}",
                self.target_compression_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.max_quality_loss) {
            return Err(AssetError::InvalidTarget(format!(
                "max_quality_loss must be in [0, 1], got {}",
                self.max_quality_loss
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub success: bool,
    pub asset_id: String,
    pub memory_saved_mb: f64,
    /// New footprint over original, 1 when nothing changed
    pub compression_ratio: f64,
    pub optimizations: Vec<OptimizationKind>,
    pub processing_time: Duration,
}

impl OptimizationResult {
    /// Tags of the applied steps, in order
    pub fn applied(&self) -> Vec<&'static str> {
        self.optimizations.iter().map(|k| k.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Sum over successful optimizations
    pub total_memory_saved_mb: f64,
    pub results: Vec<OptimizationResult>,
    pub errors: Vec<(String, AssetError)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryOptimizationResult {
    pub memory_freed_mb: f64,
    pub assets_unloaded: usize,
    pub optimizations_queued: usize,
    pub success: bool,
}

#[derive(Debug, Default)]
struct CompressionTally {
    ratio_sum: f64,
    completed: u64,
}

struct EngineInner<S: AsyncSpawner> {
    store: AssetStore<S>,
    targets: RwLock<OptimizationTargets>,
    simplifier: RwLock<Box<dyn MeshSimplifier>>,
    queue: Mutex<OptimizationQueue>,
    wake: Arc<Notify>,
    running: AtomicBool,
    /// Held by the one live worker until its loop exits
    worker_alive: AtomicBool,
    in_flight: Mutex<Option<String>>,
    access: Mutex<AccessStats>,
    tally: Mutex<CompressionTally>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl<S: AsyncSpawner> EngineInner<S> {
    /// Release the worker slot on exit
    ///
    /// Returns `true` when a restart landed between the stop and the
    /// release; the exiting worker then keeps the slot and carries on.
    fn retire_worker(&self) -> bool {
        self.worker_alive.store(false, Ordering::SeqCst);
        self.running.load(Ordering::SeqCst) && !self.worker_alive.swap(true, Ordering::SeqCst)
    }
}

/// Frees the worker slot if the worker future is dropped before it retires
struct WorkerSlot<S: AsyncSpawner> {
    inner: Weak<EngineInner<S>>,
    held: bool,
}

impl<S: AsyncSpawner> Drop for WorkerSlot<S> {
    fn drop(&mut self) {
        if let (true, Some(inner)) = (self.held, self.inner.upgrade()) {
            inner.worker_alive.store(false, Ordering::SeqCst);
        }
    }
}

/// Optimizer bound to one [`AssetStore`]; clones share state
pub struct OptimizationEngine<S: AsyncSpawner = TokioSpawner> {
    inner: Arc<EngineInner<S>>,
}

impl<S: AsyncSpawner> Clone for OptimizationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AsyncSpawner> std::fmt::Debug for OptimizationEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizationEngine")
            .field("targets", &*self.inner.targets.read())
            .field("queued", &self.inner.queue.lock().len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl<S: AsyncSpawner> OptimizationEngine<S> {
    /// Create an engine and subscribe it to the store's access and memory
    /// events
    pub fn new(store: AssetStore<S>) -> Self {
        let engine = Self {
            inner: Arc::new(EngineInner {
                store,
                targets: RwLock::new(OptimizationTargets::default()),
                simplifier: RwLock::new(default_simplifier()),
                queue: Mutex::new(OptimizationQueue::new()),
                wake: Arc::new(Notify::new()),
                running: AtomicBool::new(false),
                worker_alive: AtomicBool::new(false),
                in_flight: Mutex::new(None),
                access: Mutex::new(AccessStats::new()),
                tally: Mutex::new(CompressionTally::default()),
                subscriptions: Mutex::new(Vec::new()),
            }),
        };
        engine.subscribe();
        engine
    }

    fn subscribe(&self) {
        let events = self.inner.store.events();

        let weak = Arc::downgrade(&self.inner);
        let accessed = events.subscribe(EventKind::AssetAccessed, move |event| {
            if let (Some(inner), AssetEvent::AssetAccessed { id, .. }) = (weak.upgrade(), event) {
                inner.access.lock().record(id, Instant::now());
            }
        });

        let weak: Weak<EngineInner<S>> = Arc::downgrade(&self.inner);
        let pressure = events.subscribe(EventKind::MemoryStats, move |event| {
            let AssetEvent::MemoryStats(stats) = event else {
                return;
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let engine = OptimizationEngine { inner };
            let threshold = engine.inner.store.policy().current().pressure_threshold * 100.0;
            if stats.utilization > threshold {
                log::info!(
                    "Memory pressure at {:.1}%, running memory optimization",
                    stats.utilization
                );
                engine.perform_memory_optimization();
            }
        });

        self.inner
            .subscriptions
            .lock()
            .extend([accessed, pressure]);
    }

    /// Stop the worker and detach from the store's events
    pub fn shutdown(&self) {
        self.stop_optimization();
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        for id in subscriptions {
            self.inner.store.events().unsubscribe(id);
        }
    }

    pub fn store(&self) -> &AssetStore<S> {
        &self.inner.store
    }

    pub fn optimization_targets(&self) -> OptimizationTargets {
        *self.inner.targets.read()
    }

    pub fn set_optimization_targets(&self, targets: OptimizationTargets) -> Result<()> {
        targets.validate()?;
        *self.inner.targets.write() = targets;
        Ok(())
    }

    /// Replace the mesh simplifier used for models
    pub fn set_simplifier(&self, simplifier: Box<dyn MeshSimplifier>) {
        *self.inner.simplifier.write() = simplifier;
    }

    // ---- single and batch optimization ----

    /// Optimize one asset, loading it first if needed
    pub async fn optimize_asset(
        &self,
        id: &str,
        target: PerformanceTarget,
    ) -> Result<OptimizationResult> {
        target.validate()?;
        let started = Instant::now();
        let asset = self.inner.store.load(id, Priority::Normal).await?;

        let ctx = TransformContext {
            targets: *self.inner.targets.read(),
            target,
            footprint_mb: asset.footprint_mb,
        };
        let simplifier = self.inner.simplifier.read().box_clone();
        let payload = Arc::clone(&asset.payload);
        let work = self.inner.store.spawner().spawn_blocking(move || {
            strategies::transform(&payload, &ctx, simplifier.as_ref())
        });

        let transformed = match tokio::time::timeout(target.max_processing_time, work).await {
            Ok(Some(transformed)) => transformed,
            Ok(None) => {
                return Err(AssetError::OptimizationFailed {
                    id: id.to_string(),
                    reason: "transform worker failed".to_string(),
                })
            }
            Err(_) => {
                return Err(AssetError::OptimizationFailed {
                    id: id.to_string(),
                    reason: format!(
                        "exceeded processing time of {:?}",
                        target.max_processing_time
                    ),
                })
            }
        };

        if transformed.applied.is_empty() {
            log::debug!("Nothing to optimize in {id}");
            return Ok(OptimizationResult {
                success: true,
                asset_id: id.to_string(),
                memory_saved_mb: 0.0,
                compression_ratio: 1.0,
                optimizations: Vec::new(),
                processing_time: started.elapsed(),
            });
        }

        let original_bytes = asset.payload.estimated_size();
        let footprint_mb = if original_bytes > 0 {
            asset.footprint_mb * transformed.payload.estimated_size() as f64 / original_bytes as f64
        } else {
            asset.footprint_mb
        };

        let swapped = self
            .inner
            .store
            .swap_payload(id, &asset.payload, transformed.payload, footprint_mb)
            .ok_or_else(|| AssetError::OptimizationFailed {
                id: id.to_string(),
                reason: "asset was unloaded or replaced during optimization".to_string(),
            })?;

        let memory_saved_mb = (swapped.previous_mb - swapped.current_mb).max(0.0);
        let compression_ratio = if swapped.previous_mb > 0.0 {
            swapped.current_mb / swapped.previous_mb
        } else {
            1.0
        };
        let processing_time = started.elapsed();

        {
            let mut tally = self.inner.tally.lock();
            tally.ratio_sum += compression_ratio;
            tally.completed += 1;
        }
        self.inner
            .store
            .metrics()
            .record_optimization(id, asset.kind, processing_time);
        log::info!(
            "Optimized {} {id}: saved {memory_saved_mb:.2} MB (ratio {compression_ratio:.2})",
            asset.kind
        );
        self.inner.store.events().publish(AssetEvent::AssetOptimized {
            id: id.to_string(),
            memory_saved_mb,
            compression_ratio,
        });

        Ok(OptimizationResult {
            success: true,
            asset_id: id.to_string(),
            memory_saved_mb,
            compression_ratio,
            optimizations: transformed.applied,
            processing_time,
        })
    }

    /// Optimize `ids` one after another; a failure does not stop the batch
    pub async fn batch_optimize_assets(
        &self,
        ids: &[String],
        target: PerformanceTarget,
    ) -> BatchResult {
        let mut batch = BatchResult {
            total: ids.len(),
            ..BatchResult::default()
        };
        for id in ids {
            match self.optimize_asset(id, target).await {
                Ok(result) => {
                    batch.successful += 1;
                    batch.total_memory_saved_mb += result.memory_saved_mb;
                    batch.results.push(result);
                }
                Err(err) => {
                    log::warn!("Batch optimization of {id} failed: {err}");
                    batch.failed += 1;
                    batch.errors.push((id.clone(), err));
                }
            }
        }
        batch
    }

    // ---- background queue ----

    pub fn queue_asset_optimization(&self, id: &str, priority: Priority) -> Uuid {
        self.queue_asset_optimization_with_target(id, priority, PerformanceTarget::default())
    }

    pub fn queue_asset_optimization_with_target(
        &self,
        id: &str,
        priority: Priority,
        target: PerformanceTarget,
    ) -> Uuid {
        let task_id = self.inner.queue.lock().push(id, priority, target);
        log::debug!("Queued optimization of {id} at {priority} priority");
        self.inner.wake.notify_one();
        task_id
    }

    pub fn get_queue_status(&self) -> QueueStatus {
        let queue = self.inner.queue.lock();
        QueueStatus {
            total_tasks: queue.len(),
            priority_breakdown: queue.breakdown(),
            estimated_processing_time: queue.estimated_processing_time(),
            is_processing: self.is_running(),
            in_flight: self.inner.in_flight.lock().clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start the background worker; `false` if it was already running
    ///
    /// A worker stopped moments ago that has not exited yet is resumed
    /// instead of spawning a second one.
    pub fn start_optimization(&self) -> bool {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.inner.worker_alive.swap(true, Ordering::SeqCst) {
            log::debug!("Resuming optimization worker");
            self.inner.wake.notify_one();
            return true;
        }

        let weak = Arc::downgrade(&self.inner);
        let wake = Arc::clone(&self.inner.wake);
        let mut slot = WorkerSlot {
            inner: weak.clone(),
            held: true,
        };
        self.inner.store.spawner().spawn(async move {
            loop {
                let next = {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    if !inner.running.load(Ordering::SeqCst) {
                        if inner.retire_worker() {
                            continue;
                        }
                        slot.held = false;
                        break;
                    }
                    let task = inner.queue.lock().pop();
                    task.map(|task| (OptimizationEngine { inner }, task))
                };
                match next {
                    Some((engine, task)) => {
                        engine.run_task(task).await;
                    }
                    None => wake.notified().await,
                }
            }
            log::debug!("Optimization worker stopped");
        });
        true
    }

    pub fn stop_optimization(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    /// Run the next queued task on the caller's task
    ///
    /// Returns `None` when the queue is empty. Tasks whose asset left the
    /// cache are dropped and yield `Some(None)`.
    pub async fn process_next_task(&self) -> Option<Option<Result<OptimizationResult>>> {
        let task = self.inner.queue.lock().pop()?;
        Some(self.run_task(task).await)
    }

    async fn run_task(&self, task: OptimizationTask) -> Option<Result<OptimizationResult>> {
        if !self.inner.store.is_resident(&task.asset_id) {
            log::debug!(
                "Dropping optimization of {}: no longer resident",
                task.asset_id
            );
            return None;
        }

        *self.inner.in_flight.lock() = Some(task.asset_id.clone());
        let result = self.optimize_asset(&task.asset_id, task.target).await;
        *self.inner.in_flight.lock() = None;

        if let Err(err) = &result {
            log::warn!("Queued optimization of {} failed: {err}", task.asset_id);
        }
        Some(result)
    }

    // ---- caching policy ----

    pub fn apply_caching_strategy(&self, strategy: CachingStrategy) {
        log::info!("Switching caching strategy to {strategy}");
        self.inner.store.policy().apply(strategy);
    }

    /// Parse and apply a strategy name such as `memory_optimized`
    pub fn apply_caching_strategy_named(&self, name: &str) -> Result<CachingStrategy> {
        let strategy: CachingStrategy = name.parse()?;
        self.apply_caching_strategy(strategy);
        Ok(strategy)
    }

    pub fn get_caching_recommendations(&self) -> Vec<CachingRecommendation> {
        let store = &self.inner.store;
        let memory = store.memory_stats();
        let metrics = store.metrics();
        let lookups = metrics.cache_hits() + metrics.cache_misses();
        self.inner.access.lock().recommendations(
            &memory,
            metrics.cache_hit_rate(),
            lookups,
            store.policy().strategy(),
        )
    }

    // ---- memory pressure ----

    /// Clean up the cache and queue the largest raw residents for
    /// optimization
    pub fn perform_memory_optimization(&self) -> MemoryOptimizationResult {
        let store = &self.inner.store;
        let before = store.memory_stats();
        let threshold = store.policy().current().pressure_threshold * 100.0;

        let report = store.cleanup();
        let candidates = store.largest_unoptimized(PRESSURE_OPTIMIZATION_BATCH);
        for asset in &candidates {
            self.queue_asset_optimization(&asset.id, Priority::High);
        }

        let under_pressure = before.utilization > threshold;
        let progressed = report.freed_mb > 0.0 || !candidates.is_empty();
        MemoryOptimizationResult {
            memory_freed_mb: report.freed_mb,
            assets_unloaded: report.evicted.len(),
            optimizations_queued: candidates.len(),
            success: !under_pressure || progressed,
        }
    }

    // ---- diagnostics ----

    fn snapshot(&self) -> DiagnosticsSnapshot {
        let store = &self.inner.store;
        let metrics = store.metrics();
        let tally = self.inner.tally.lock();
        let average_compression_ratio = if tally.completed > 0 {
            tally.ratio_sum / tally.completed as f64
        } else {
            1.0
        };
        DiagnosticsSnapshot {
            memory: store.memory_stats(),
            residents: store.residents(),
            samples: metrics.recent_samples(),
            cache_hit_rate: metrics.cache_hit_rate(),
            lookups: metrics.cache_hits() + metrics.cache_misses(),
            average_compression_ratio,
            optimizations_completed: tally.completed,
            queued_optimizations: self.inner.queue.lock().len(),
        }
    }

    pub fn get_performance_bottlenecks(&self) -> BottleneckAnalysis {
        diagnostics::analyze(&self.snapshot())
    }

    pub fn get_optimization_report(&self) -> OptimizationReport {
        diagnostics::report(&self.snapshot())
    }
}
