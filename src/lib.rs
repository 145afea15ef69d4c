//! avatar_asset - Memory-budgeted asset cache and optimizer for avatar rendering
//!
//! # Features
//! - Admission and eviction under a hard memory ceiling (2048 MB reference)
//! - De-duplicated concurrent loads and dependency-ordered loading
//! - Reference-counted unloading and background preloading
//! - Texture, mesh and animation optimization with a priority queue
//! - Event bus for telemetry and memory-pressure recovery
//!
//! # Quick Start
//!
//! ```ignore
//! use avatar_asset::{AssetStore, MockBackend, OptimizationEngine, Priority, StoreConfig};
//!
//! let store = AssetStore::new(MockBackend::new(), StoreConfig::default());
//! let engine = OptimizationEngine::new(store.clone());
//! let avatar = store.load("avatar", Priority::High).await?;
//! engine.queue_asset_optimization("avatar", Priority::Normal);
//! engine.start_optimization();
//! ```
//!
//! # Feature Flags
//!
//! - `lod`: Enable mesh simplification with meshopt

// Core modules
pub mod cache;
pub mod events;
pub mod loader;
pub mod lod;
pub mod optimizer;
pub mod runtime;

// Payload modules
pub mod animation;
pub mod asset;
pub mod model;
pub mod texture;
pub mod types;

// Error types
mod error;
pub use error::{AssetError, Result};

// Re-export main types from cache
pub use cache::budget::{MemoryBudget, MemoryStats, REFERENCE_MEMORY_MB};
pub use cache::deps::DependencyGraph;
pub use cache::metrics::{AssetMetrics, AssetMetricsHandle, Operation, OperationSample};
pub use cache::policy::{CachePolicy, CachingStrategy, PolicyHandle};
pub use cache::{AssetStore, CleanupReport, StoreConfig};

// Re-export optimizer types
pub use optimizer::diagnostics::{BottleneckAnalysis, BottleneckCategory, OptimizationReport};
pub use optimizer::queue::{OptimizationTask, PriorityBreakdown, QueueStatus};
pub use optimizer::stats::{CachingRecommendation, RecommendationKind};
pub use optimizer::{
    BatchResult, MemoryOptimizationResult, OptimizationEngine, OptimizationKind,
    OptimizationResult, OptimizationTargets, PerformanceTarget,
};

// Re-export events
pub use events::{AssetEvent, EventBus, EventKind, SubscriptionId};

// Re-export loaders
pub use loader::{AssetBackend, BackendError, BackendResult, FsBackend, LoadedPayload, MockBackend};

// Re-export runtime types
pub use runtime::mock::MockSpawner;
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::{AsyncSpawner, JoinHandle};

// Re-export payload types
pub use animation::{AnimationChannel, AnimationData, ChannelProperty, Keyframe};
pub use asset::{Asset, AssetPayload, BYTES_PER_MB};
pub use model::{ModelData, VertexFormat};
pub use texture::{TextureData, TextureFormat};
pub use types::{AssetKind, OptimizationState, Priority};

// Re-export LOD types
#[cfg(feature = "lod")]
pub use lod::MeshoptSimplifier;
pub use lod::{DefaultSimplifier, MeshSimplifier};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
