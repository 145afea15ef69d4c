//! Error types for avatar_asset

use thiserror::Error;

/// Main error type for cache and optimizer operations
///
/// Cloneable so that every caller joined onto the same in-flight load
/// observes an identical failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Memory exceeded loading {id}: requires {required_mb:.2} MB, {available_mb:.2} MB reclaimable")]
    MemoryExceeded {
        id: String,
        required_mb: f64,
        available_mb: f64,
    },

    #[error("Optimization of {id} failed: {reason}")]
    OptimizationFailed { id: String, reason: String },

    #[error("Invalid optimization target: {0}")]
    InvalidTarget(String),

    #[error("Unknown caching strategy: {0}")]
    UnknownStrategy(String),

    #[error("Asset store has been disposed")]
    Disposed,
}

/// Result type alias for asset operations
pub type Result<T> = std::result::Result<T, AssetError>;
