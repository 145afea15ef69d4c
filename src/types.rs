//! Shared identifiers and enums used by the cache and the optimizer

use std::fmt;

/// Kind of asset, which also selects the backend loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Model,
    Texture,
    Animation,
}

impl AssetKind {
    /// Probe order used when the caller does not name a kind
    pub const PROBE_ORDER: [AssetKind; 3] =
        [AssetKind::Model, AssetKind::Texture, AssetKind::Animation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Texture => "texture",
            Self::Animation => "animation",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority class shared by admission and optimization scheduling
///
/// Ordering is `Critical > High > Normal > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl Priority {
    /// All classes from most to least urgent
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a resident payload has been rewritten by the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationState {
    #[default]
    Raw,
    Optimized,
}
