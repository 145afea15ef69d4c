//! Memory-budgeted asset cache
//!
//! [`AssetStore`] keeps decoded assets resident under a fixed memory ceiling.
//! It de-duplicates concurrent loads of the same id, loads declared
//! dependencies first, evicts by priority then least-recent use, and never
//! drops an asset that is still referenced.

pub mod budget;
pub mod deps;
pub mod metrics;
pub mod policy;
pub mod preload;
pub mod ticket;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};

use crate::asset::{Asset, AssetPayload};
use crate::error::{AssetError, Result};
use crate::events::{AssetEvent, EventBus};
use crate::loader::{AssetBackend, LoadedPayload};
use crate::runtime::{AsyncSpawner, JoinHandle, TokioSpawner};
use crate::types::{AssetKind, OptimizationState, Priority};

use budget::{eviction_order, plan_evictions, EvictionCandidate, MemoryBudget, MemoryStats};
use deps::DependencyGraph;
use metrics::AssetMetricsHandle;
use policy::{CachingStrategy, PolicyHandle};
use preload::{PreloadQueue, DEFAULT_PRELOAD_CAPACITY};
use ticket::{LoadOutcome, LoadTicket};

pub use budget::REFERENCE_MEMORY_MB;

/// Store construction options
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub max_memory_mb: f64,
    pub preload_capacity: usize,
    /// Run cleanup when utilization crosses the policy pressure threshold
    pub auto_cleanup: bool,
    pub strategy: CachingStrategy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: REFERENCE_MEMORY_MB,
            preload_capacity: DEFAULT_PRELOAD_CAPACITY,
            auto_cleanup: true,
            strategy: CachingStrategy::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_max_memory_mb(mut self, max_memory_mb: f64) -> Self {
        self.max_memory_mb = max_memory_mb;
        self
    }

    pub fn with_preload_capacity(mut self, capacity: usize) -> Self {
        self.preload_capacity = capacity;
        self
    }

    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }

    pub fn with_strategy(mut self, strategy: CachingStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// What a cleanup pass evicted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub freed_mb: f64,
    pub evicted: Vec<String>,
}

/// Footprints before and after a payload swap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapOutcome {
    pub previous_mb: f64,
    pub current_mb: f64,
}

#[derive(Debug)]
struct StoreState {
    residents: HashMap<String, Asset>,
    budget: MemoryBudget,
    tickets: HashMap<String, LoadTicket>,
}

impl StoreState {
    /// Refcount-0 residents outside `protected`
    fn candidates(&self, protected: &HashSet<String>) -> Vec<EvictionCandidate> {
        self.residents
            .values()
            .filter(|asset| asset.ref_count == 0 && !protected.contains(&asset.id))
            .map(|asset| EvictionCandidate {
                id: asset.id.clone(),
                priority: asset.priority,
                last_access: asset.last_access,
                footprint_mb: asset.footprint_mb,
            })
            .collect()
    }

    fn evict(&mut self, id: &str) -> Option<f64> {
        let asset = self.residents.remove(id)?;
        self.budget.reclaim(asset.footprint_mb);
        Some(asset.footprint_mb)
    }

    /// Evict until `footprint_mb` fits, or fail without evicting anything
    fn make_room(
        &mut self,
        id: &str,
        footprint_mb: f64,
        protected: &HashSet<String>,
        headroom: f64,
    ) -> Result<Vec<(String, f64)>> {
        let max = self.budget.max_mb();
        if footprint_mb > max {
            return Err(AssetError::MemoryExceeded {
                id: id.to_string(),
                required_mb: footprint_mb,
                available_mb: max,
            });
        }
        if self.budget.fits(footprint_mb) {
            return Ok(Vec::new());
        }

        let need = self.budget.used_mb() + footprint_mb - max;
        let want = need + headroom.max(0.0) * max;
        let candidates = self.candidates(protected);
        let reclaimable: f64 = candidates.iter().map(|c| c.footprint_mb).sum();

        let Some(plan) = plan_evictions(candidates, need, want) else {
            return Err(AssetError::MemoryExceeded {
                id: id.to_string(),
                required_mb: footprint_mb,
                available_mb: self.budget.available_mb() + reclaimable,
            });
        };

        Ok(plan
            .into_iter()
            .filter_map(|victim| self.evict(&victim.id).map(|mb| (victim.id, mb)))
            .collect())
    }
}

struct CleanupGuard<'a>(&'a AtomicBool);

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct StoreInner<S> {
    backend: Arc<dyn AssetBackend>,
    state: Mutex<StoreState>,
    deps: RwLock<DependencyGraph>,
    policy: PolicyHandle,
    events: EventBus,
    metrics: AssetMetricsHandle,
    preload: PreloadQueue,
    config: StoreConfig,
    spawner: S,
    disposed: AtomicBool,
    cleaning: AtomicBool,
}

/// Asset cache shared by the renderer and the optimizer
///
/// Generic over the spawner that runs background work. Clones share the same
/// resident set.
pub struct AssetStore<S: AsyncSpawner = TokioSpawner> {
    inner: Arc<StoreInner<S>>,
}

impl<S: AsyncSpawner> Clone for AssetStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AsyncSpawner> std::fmt::Debug for AssetStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("backend", &self.inner.backend.backend_name())
            .field("runtime", &self.inner.spawner.runtime_name())
            .field("stats", &self.memory_stats())
            .finish()
    }
}

impl AssetStore<TokioSpawner> {
    /// Create a store that runs background work on the ambient Tokio runtime
    pub fn new<B>(backend: B, config: StoreConfig) -> Self
    where
        B: AssetBackend + 'static,
    {
        Self::with_spawner(backend, config, TokioSpawner::new())
    }
}

impl<S: AsyncSpawner> AssetStore<S> {
    pub fn with_spawner<B>(backend: B, config: StoreConfig, spawner: S) -> Self
    where
        B: AssetBackend + 'static,
    {
        Self::from_shared(Arc::new(backend), config, spawner)
    }

    /// Create a store over a backend that is also used elsewhere
    pub fn from_shared(backend: Arc<dyn AssetBackend>, config: StoreConfig, spawner: S) -> Self {
        log::debug!(
            "Creating asset store over {} backend ({} MB, {})",
            backend.backend_name(),
            config.max_memory_mb,
            config.strategy
        );
        Self {
            inner: Arc::new(StoreInner {
                backend,
                state: Mutex::new(StoreState {
                    residents: HashMap::new(),
                    budget: MemoryBudget::new(config.max_memory_mb),
                    tickets: HashMap::new(),
                }),
                deps: RwLock::new(DependencyGraph::new()),
                policy: PolicyHandle::new(config.strategy),
                events: EventBus::new(),
                metrics: AssetMetricsHandle::new(),
                preload: PreloadQueue::new(config.preload_capacity),
                config,
                spawner,
                disposed: AtomicBool::new(false),
                cleaning: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.inner.policy
    }

    /// Get a reference to the metrics handle
    pub fn metrics(&self) -> &AssetMetricsHandle {
        &self.inner.metrics
    }

    pub fn spawner(&self) -> &S {
        &self.inner.spawner
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(AssetError::Disposed)
        } else {
            Ok(())
        }
    }

    // ---- loading ----

    /// Load `id`, probing model, texture then animation loaders
    pub async fn load(&self, id: &str, priority: Priority) -> Result<Asset> {
        self.load_inner(id, None, priority).await
    }

    /// Load `id` through the loader for `kind`
    pub async fn load_kind(&self, id: &str, kind: AssetKind, priority: Priority) -> Result<Asset> {
        self.load_inner(id, Some(kind), priority).await
    }

    async fn load_inner(
        &self,
        id: &str,
        kind: Option<AssetKind>,
        priority: Priority,
    ) -> Result<Asset> {
        self.ensure_live()?;

        if let Some(asset) = self.touch(id) {
            self.inner.metrics.record_cache_hit();
            self.publish_access(id, true);
            return Ok(asset);
        }
        self.inner.metrics.record_cache_miss();
        self.publish_access(id, false);

        let order = self.inner.deps.read().loading_order_for(id);
        for dep in order {
            if let Err(err) = self.load_single(&dep, None, priority).await {
                log::warn!("Dependency {dep} of {id} failed to load: {err}");
            }
        }

        self.load_single(id, kind, priority).await
    }

    fn publish_access(&self, id: &str, cache_hit: bool) {
        self.inner.events.publish(AssetEvent::AssetAccessed {
            id: id.to_string(),
            cache_hit,
        });
    }

    /// Resident snapshot with its access time refreshed
    fn touch(&self, id: &str) -> Option<Asset> {
        let mut state = self.inner.state.lock();
        let asset = state.residents.get_mut(id)?;
        asset.last_access = Instant::now();
        Some(asset.clone())
    }

    /// Return the resident, join the in-flight ticket, or start one
    async fn load_single(
        &self,
        id: &str,
        kind: Option<AssetKind>,
        priority: Priority,
    ) -> Result<Asset> {
        self.ensure_live()?;
        let completion = {
            let mut state = self.inner.state.lock();
            if let Some(asset) = state.residents.get_mut(id) {
                asset.last_access = Instant::now();
                return Ok(asset.clone());
            }
            match state.tickets.get(id) {
                Some(ticket) => ticket.join(),
                None => {
                    let load = self.clone().run_load(id.to_string(), kind, priority).boxed();
                    let ticket = LoadTicket::new(priority, kind, load);
                    let completion = ticket.join();
                    state.tickets.insert(id.to_string(), ticket);
                    completion
                }
            }
        };
        completion.await
    }

    /// Body of a ticket: one backend call plus admission
    async fn run_load(
        self,
        id: String,
        kind: Option<AssetKind>,
        priority: Priority,
    ) -> LoadOutcome {
        let started = Instant::now();
        let outcome = match self.fetch(&id, kind).await {
            Ok(loaded) => self.admit(&id, loaded, priority, started),
            Err(err) => {
                self.inner.state.lock().tickets.remove(&id);
                Err(err)
            }
        };

        match &outcome {
            Ok(_) | Err(AssetError::Disposed) => {}
            Err(err) => {
                log::warn!("Failed to load {id}: {err}");
                self.inner.events.publish(AssetEvent::LoadError {
                    id: id.clone(),
                    error: err.to_string(),
                });
            }
        }
        outcome
    }

    async fn fetch(&self, id: &str, kind: Option<AssetKind>) -> Result<LoadedPayload> {
        let probes = kind.map_or_else(|| AssetKind::PROBE_ORDER.to_vec(), |kind| vec![kind]);
        for probe in probes {
            match self.inner.backend.load_kind(id, probe).await {
                Ok(loaded) => return Ok(loaded),
                Err(err) => log::debug!(
                    "{} backend could not load {probe} {id}: {err}",
                    self.inner.backend.backend_name()
                ),
            }
        }
        Err(AssetError::NotFound(id.to_string()))
    }

    fn admit(
        &self,
        id: &str,
        loaded: LoadedPayload,
        priority: Priority,
        started: Instant,
    ) -> LoadOutcome {
        let LoadedPayload {
            payload,
            footprint_mb,
        } = loaded;
        let footprint_mb = footprint_mb.max(0.0);
        let (dependencies, protected) = {
            let deps = self.inner.deps.read();
            let protected: HashSet<String> = deps.loading_order_for(id).into_iter().collect();
            (deps.get(id), protected)
        };
        let headroom = self.inner.policy.current().eviction_headroom;

        let admitted = {
            let mut state = self.inner.state.lock();
            state.tickets.remove(id);
            if self.is_disposed() {
                return Err(AssetError::Disposed);
            }
            state
                .make_room(id, footprint_mb, &protected, headroom)
                .map(|evicted| {
                    let asset = Asset::new(
                        id.to_string(),
                        payload,
                        footprint_mb,
                        priority,
                        dependencies,
                    );
                    state.budget.charge(footprint_mb);
                    state.residents.insert(id.to_string(), asset.clone());
                    (asset, evicted)
                })
        };

        let (asset, evicted) = admitted?;
        self.inner.metrics.record_load(id, asset.kind, started.elapsed());
        self.publish_evictions(&evicted);
        log::debug!(
            "Admitted {} {id} ({footprint_mb:.2} MB, {} evicted)",
            asset.kind,
            evicted.len()
        );
        self.inner
            .events
            .publish(AssetEvent::loaded(asset.kind, id.to_string(), footprint_mb));
        self.emit_stats();
        Ok(asset)
    }

    fn publish_evictions(&self, evicted: &[(String, f64)]) {
        if evicted.is_empty() {
            return;
        }
        self.inner.metrics.record_evictions(evicted.len());
        for (id, freed_mb) in evicted {
            self.inner.events.publish(AssetEvent::AssetEvicted {
                id: id.clone(),
                freed_mb: *freed_mb,
            });
        }
    }

    // ---- residents and reference counts ----

    /// Resident snapshot without counting an access
    pub fn get(&self, id: &str) -> Option<Asset> {
        self.inner.state.lock().residents.get(id).cloned()
    }

    pub fn is_resident(&self, id: &str) -> bool {
        self.inner.state.lock().residents.contains_key(id)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.inner.state.lock().tickets.contains_key(id)
    }

    /// Snapshots of every resident asset
    pub fn residents(&self) -> Vec<Asset> {
        self.inner.state.lock().residents.values().cloned().collect()
    }

    /// Pin a resident asset so it cannot be evicted or unloaded
    pub fn acquire(&self, id: &str) -> Option<Asset> {
        let mut state = self.inner.state.lock();
        let asset = state.residents.get_mut(id)?;
        asset.ref_count += 1;
        asset.last_access = Instant::now();
        Some(asset.clone())
    }

    /// Drop one reference; `false` if `id` is not resident
    pub fn release(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock();
        match state.residents.get_mut(id) {
            Some(asset) => {
                asset.ref_count = asset.ref_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn ref_count(&self, id: &str) -> Option<u32> {
        self.inner.state.lock().residents.get(id).map(|a| a.ref_count)
    }

    /// Remove an unreferenced resident
    pub fn unload(&self, id: &str) -> bool {
        enum Outcome {
            Missing,
            Blocked(u32),
            Removed(f64),
        }

        let outcome = {
            let mut state = self.inner.state.lock();
            match state.residents.get(id).map(|asset| asset.ref_count) {
                None => Outcome::Missing,
                Some(ref_count) if ref_count > 0 => Outcome::Blocked(ref_count),
                Some(_) => state.evict(id).map_or(Outcome::Missing, Outcome::Removed),
            }
        };

        match outcome {
            Outcome::Blocked(ref_count) => {
                log::debug!("Refusing to unload {id}: {ref_count} references held");
                self.inner.events.publish(AssetEvent::UnloadBlocked {
                    id: id.to_string(),
                    ref_count,
                });
                false
            }
            Outcome::Missing => {
                self.inner.preload.remove(id);
                false
            }
            Outcome::Removed(freed_mb) => {
                self.inner.preload.remove(id);
                self.inner.events.publish(AssetEvent::AssetUnloaded {
                    id: id.to_string(),
                    freed_mb,
                });
                self.emit_stats();
                true
            }
        }
    }

    /// Refcount-0, unoptimized residents, largest first
    pub fn largest_unoptimized(&self, limit: usize) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self
            .inner
            .state
            .lock()
            .residents
            .values()
            .filter(|a| a.ref_count == 0 && a.state == OptimizationState::Raw)
            .cloned()
            .collect();
        assets.sort_by(|a, b| b.footprint_mb.total_cmp(&a.footprint_mb));
        assets.truncate(limit);
        assets
    }

    /// Replace the payload of `id` if it is still `original`
    ///
    /// Refcount, priority and dependencies are kept. Returns `None` when the
    /// asset left the cache or was swapped by someone else meanwhile.
    pub(crate) fn swap_payload(
        &self,
        id: &str,
        original: &Arc<AssetPayload>,
        payload: AssetPayload,
        footprint_mb: f64,
    ) -> Option<SwapOutcome> {
        let mut state = self.inner.state.lock();
        let state = &mut *state;
        let asset = state.residents.get_mut(id)?;
        if !Arc::ptr_eq(&asset.payload, original) {
            return None;
        }

        let previous_mb = asset.footprint_mb;
        let current_mb = footprint_mb.clamp(0.0, previous_mb);
        asset.payload = Arc::new(payload);
        asset.footprint_mb = current_mb;
        asset.state = OptimizationState::Optimized;
        state.budget.reclaim(previous_mb);
        state.budget.charge(current_mb);
        Some(SwapOutcome {
            previous_mb,
            current_mb,
        })
    }

    // ---- dependencies ----

    /// Declare the dependencies of `id`, replacing earlier ones
    pub fn set_dependencies<I, D>(&self, id: &str, deps: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        let deps: Vec<String> = deps.into_iter().map(Into::into).collect();
        let stored = {
            let mut graph = self.inner.deps.write();
            graph.set(id, &deps);
            graph.get(id)
        };
        if let Some(asset) = self.inner.state.lock().residents.get_mut(id) {
            asset.dependencies = stored;
        }
    }

    pub fn get_dependencies(&self, id: &str) -> Vec<String> {
        self.inner.deps.read().get(id)
    }

    /// Order `ids` so declared dependencies load first; cycles are tolerated
    pub fn optimize_loading_order(&self, ids: &[String]) -> Vec<String> {
        self.inner.deps.read().optimize_loading_order(ids)
    }

    // ---- preload ----

    /// Queue `ids` for background loading at normal priority
    pub fn preload<I, D>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.preload_with_priority(ids, Priority::Normal)
    }

    /// Queue `ids` (and their dependencies up to the prefetch depth) and
    /// return the queue size. Never waits for the loads.
    pub fn preload_with_priority<I, D>(&self, ids: I, priority: Priority) -> usize
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let requested = ids.len();
        if self.is_disposed() {
            log::warn!("Ignoring preload of {requested} assets on a disposed store");
            return 0;
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        let depth = self.inner.policy.current().prefetch_depth;
        let ordered = {
            let graph = self.inner.deps.read();
            let mut all = ids.clone();
            all.extend(graph.expand(&ids, depth));
            graph.optimize_loading_order(&all)
        };

        let pending: Vec<String> = {
            let state = self.inner.state.lock();
            ordered
                .into_iter()
                .filter(|id| !state.residents.contains_key(id) && !state.tickets.contains_key(id))
                .collect()
        };

        let outcome = self.inner.preload.push_all(pending, priority);
        for id in outcome.rejected {
            log::warn!("Preload queue full, dropping {id}");
            self.inner.events.publish(AssetEvent::PreloadError {
                id,
                error: "preload queue is full".to_string(),
            });
        }

        let queue_size = self.inner.preload.len();
        self.inner.events.publish(AssetEvent::PreloadQueued {
            requested,
            queue_size,
        });
        if !outcome.queued.is_empty() {
            self.start_drain();
        }
        queue_size
    }

    pub fn preload_queue_len(&self) -> usize {
        self.inner.preload.len()
    }

    pub fn is_preload_queued(&self, id: &str) -> bool {
        self.inner.preload.contains(id)
    }

    fn start_drain(&self) {
        if !self.inner.preload.begin_drain() {
            return;
        }
        let store = self.clone();
        self.inner.spawner.spawn(async move { store.drain_preload().await });
    }

    async fn drain_preload(self) {
        loop {
            while let Some(entry) = self.inner.preload.pop() {
                if self.is_disposed() {
                    break;
                }
                if let Err(err) = self.load(&entry.id, entry.priority).await {
                    self.inner.events.publish(AssetEvent::PreloadError {
                        id: entry.id,
                        error: err.to_string(),
                    });
                }
            }
            self.inner.preload.end_drain();

            // Entries pushed between the last pop and end_drain
            if self.is_disposed()
                || self.inner.preload.is_empty()
                || !self.inner.preload.begin_drain()
            {
                break;
            }
        }
    }

    // ---- memory ----

    pub fn memory_stats(&self) -> MemoryStats {
        let (used_mb, max_mb, utilization, resident_count, loading_count) = {
            let state = self.inner.state.lock();
            (
                state.budget.used_mb(),
                state.budget.max_mb(),
                state.budget.utilization(),
                state.residents.len(),
                state.tickets.len(),
            )
        };
        MemoryStats {
            used_mb,
            max_mb,
            utilization,
            resident_count,
            loading_count,
            preload_queue_depth: self.inner.preload.len(),
        }
    }

    /// Publish a stats snapshot and clean up if over the pressure threshold
    pub fn emit_stats(&self) {
        let stats = self.memory_stats();
        self.inner.events.publish(AssetEvent::MemoryStats(stats));

        // Subscribers may already have freed memory
        let utilization = self.inner.state.lock().budget.utilization();
        let threshold = self.inner.policy.current().pressure_threshold * 100.0;
        if self.inner.config.auto_cleanup && utilization > threshold {
            log::info!(
                "Memory pressure at {utilization:.1}% (threshold {threshold:.0}%), cleaning up"
            );
            self.cleanup();
        }
    }

    /// Evict unreferenced residents until utilization drops below the
    /// policy's low-water mark
    pub fn cleanup(&self) -> CleanupReport {
        if self
            .inner
            .cleaning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CleanupReport::default();
        }
        let _guard = CleanupGuard(&self.inner.cleaning);

        let low_water = self.inner.policy.current().low_water_mark;
        let evicted = {
            let mut state = self.inner.state.lock();
            let target_mb = state.budget.max_mb() * low_water;
            let mut candidates = state.candidates(&HashSet::new());
            eviction_order(&mut candidates);

            let mut evicted = Vec::new();
            for candidate in candidates {
                if state.budget.used_mb() < target_mb {
                    break;
                }
                if let Some(freed) = state.evict(&candidate.id) {
                    evicted.push((candidate.id, freed));
                }
            }
            evicted
        };

        let report = CleanupReport {
            freed_mb: evicted.iter().map(|(_, mb)| mb).sum(),
            evicted: evicted.iter().map(|(id, _)| id.clone()).collect(),
        };
        self.publish_evictions(&evicted);
        self.inner.events.publish(AssetEvent::MemoryCleanup {
            freed_mb: report.freed_mb,
            evicted: report.evicted.clone(),
        });
        if !report.evicted.is_empty() {
            log::info!(
                "Cleanup evicted {} assets, freed {:.2} MB",
                report.evicted.len(),
                report.freed_mb
            );
            self.emit_stats();
        }
        report
    }

    /// Run a cleanup pass and return the memory it freed
    pub fn force_cleanup(&self) -> f64 {
        self.cleanup().freed_mb
    }

    /// Publish memory stats every `period` until the store is disposed or
    /// dropped
    pub fn start_monitoring(&self, period: Duration) -> JoinHandle {
        let weak = Arc::downgrade(&self.inner);
        let period = period.max(Duration::from_millis(1));
        self.inner.spawner.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let store = AssetStore { inner };
                if store.is_disposed() {
                    break;
                }
                store.emit_stats();
            }
        })
    }

    /// Release every resident and detach all listeners
    ///
    /// In-flight loads resolve to [`AssetError::Disposed`]. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            state.residents.clear();
            state.tickets.clear();
            state.budget.reset();
        }
        self.inner.preload.clear();
        self.inner.deps.write().clear();
        log::debug!("Asset store disposed");
        self.inner.events.publish(AssetEvent::Disposed);
        self.inner.events.clear();
    }
}
