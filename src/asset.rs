//! Resident asset records and their decoded payloads

use std::sync::Arc;
use std::time::Instant;

use crate::animation::AnimationData;
use crate::model::ModelData;
use crate::texture::TextureData;
use crate::types::{AssetKind, OptimizationState, Priority};

/// Bytes per megabyte used for every footprint conversion
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Decoded asset data, opaque to the cache
#[derive(Debug, Clone, PartialEq)]
pub enum AssetPayload {
    Model(ModelData),
    Texture(TextureData),
    Animation(AnimationData),
}

impl AssetPayload {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Model(_) => AssetKind::Model,
            Self::Texture(_) => AssetKind::Texture,
            Self::Animation(_) => AssetKind::Animation,
        }
    }

    /// Estimated in-memory size derived from the decoded data
    pub fn estimated_size(&self) -> usize {
        match self {
            Self::Model(m) => m.estimated_size(),
            Self::Texture(t) => t.estimated_size(),
            Self::Animation(a) => a.estimated_size(),
        }
    }

    pub fn estimated_mb(&self) -> f64 {
        self.estimated_size() as f64 / BYTES_PER_MB
    }

    pub fn as_model(&self) -> Option<&ModelData> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&TextureData> {
        match self {
            Self::Texture(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_animation(&self) -> Option<&AnimationData> {
        match self {
            Self::Animation(a) => Some(a),
            _ => None,
        }
    }
}

/// Snapshot of a resident asset
///
/// Cloning is cheap: the payload is shared. Two snapshots describe the same
/// loaded instance when their payloads are the same allocation.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub payload: Arc<AssetPayload>,
    pub footprint_mb: f64,
    pub ref_count: u32,
    pub last_access: Instant,
    pub priority: Priority,
    pub state: OptimizationState,
    pub dependencies: Vec<String>,
}

impl Asset {
    pub(crate) fn new(
        id: String,
        payload: AssetPayload,
        footprint_mb: f64,
        priority: Priority,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            id,
            kind: payload.kind(),
            payload: Arc::new(payload),
            footprint_mb,
            ref_count: 0,
            last_access: Instant::now(),
            priority,
            state: OptimizationState::Raw,
            dependencies,
        }
    }

    /// Whether both snapshots refer to the same loaded payload
    pub fn same_instance(&self, other: &Asset) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.payload, &other.payload)
    }

    pub fn is_optimized(&self) -> bool {
        self.state == OptimizationState::Optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind() {
        let payload = AssetPayload::Texture(TextureData::rgba8(4, 4));
        assert_eq!(payload.kind(), AssetKind::Texture);
        assert!(payload.as_model().is_none());
    }

    #[test]
    fn test_same_instance() {
        let a = Asset::new(
            "a".into(),
            AssetPayload::Model(ModelData::grid(1, 1)),
            1.0,
            Priority::Normal,
            vec![],
        );
        let b = a.clone();
        assert!(a.same_instance(&b));

        let c = Asset::new(
            "a".into(),
            AssetPayload::Model(ModelData::grid(1, 1)),
            1.0,
            Priority::Normal,
            vec![],
        );
        assert!(!a.same_instance(&c));
    }
}
