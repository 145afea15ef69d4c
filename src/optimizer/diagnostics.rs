//! Bottleneck analysis and the optimization report

use crate::asset::{Asset, AssetPayload};
use crate::cache::budget::MemoryStats;
use crate::cache::metrics::OperationSample;
use crate::types::AssetKind;

/// Resident triangle count treated as fully saturating the renderer
pub const TRIANGLE_BUDGET: usize = 500_000;

/// Samples reported per bottleneck
pub const AFFECTED_OPERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottleneckCategory {
    Memory,
    TextureBandwidth,
    PolygonCount,
}

impl BottleneckCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::TextureBandwidth => "texture_bandwidth",
            Self::PolygonCount => "polygon_count",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BottleneckAnalysis {
    pub primary: BottleneckCategory,
    /// 0 (idle) to 1 (saturated)
    pub severity: f64,
    /// Slowest recent operations related to the primary category
    pub affected_operations: Vec<OperationSample>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationReport {
    pub memory: MemoryStats,
    pub bottlenecks: BottleneckAnalysis,
    /// Percentage of lookups served from the cache
    pub cache_hit_rate: f32,
    /// Mean new/original footprint over completed optimizations, 1 if none
    pub average_compression_ratio: f64,
    pub optimizations_completed: u64,
    pub queued_optimizations: usize,
    pub recommendations: Vec<String>,
    /// 0 (unhealthy) to 1 (healthy)
    pub system_health: f64,
}

/// Everything diagnostics read, captured at one point in time
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSnapshot {
    pub memory: MemoryStats,
    pub residents: Vec<Asset>,
    pub samples: Vec<OperationSample>,
    pub cache_hit_rate: f32,
    pub lookups: u64,
    pub average_compression_ratio: f64,
    pub optimizations_completed: u64,
    pub queued_optimizations: usize,
}

impl DiagnosticsSnapshot {
    fn memory_severity(&self) -> f64 {
        (self.memory.utilization / 100.0).clamp(0.0, 1.0)
    }

    /// Share of resident memory held by uncompressed textures
    fn texture_severity(&self) -> f64 {
        if self.memory.used_mb <= 0.0 {
            return 0.0;
        }
        let uncompressed_mb: f64 = self
            .residents
            .iter()
            .filter(|asset| {
                asset
                    .payload
                    .as_texture()
                    .is_some_and(|t| !t.format.is_compressed())
            })
            .map(|asset| asset.footprint_mb)
            .sum();
        (uncompressed_mb / self.memory.used_mb).clamp(0.0, 1.0)
    }

    fn polygon_severity(&self) -> f64 {
        let triangles: usize = self
            .residents
            .iter()
            .filter_map(|asset| match asset.payload.as_ref() {
                AssetPayload::Model(model) => Some(model.triangle_count()),
                _ => None,
            })
            .sum();
        (triangles as f64 / TRIANGLE_BUDGET as f64).clamp(0.0, 1.0)
    }

    fn slowest(&self, kind: Option<AssetKind>) -> Vec<OperationSample> {
        let mut samples: Vec<OperationSample> = self
            .samples
            .iter()
            .filter(|s| kind.map_or(true, |k| s.kind == k))
            .cloned()
            .collect();
        samples.sort_by(|a, b| b.duration.cmp(&a.duration));
        samples.truncate(AFFECTED_OPERATIONS);
        samples
    }
}

pub fn analyze(snapshot: &DiagnosticsSnapshot) -> BottleneckAnalysis {
    let ranked = [
        (BottleneckCategory::Memory, snapshot.memory_severity()),
        (
            BottleneckCategory::TextureBandwidth,
            snapshot.texture_severity(),
        ),
        (BottleneckCategory::PolygonCount, snapshot.polygon_severity()),
    ];
    // First wins ties, so memory is reported when nothing stands out
    let (primary, severity) = ranked
        .into_iter()
        .fold(ranked[0], |best, next| if next.1 > best.1 { next } else { best });

    let (affected_operations, recommendations) = match primary {
        BottleneckCategory::Memory => (
            snapshot.slowest(None),
            vec![
                "Run memory optimization to evict and compress the largest assets".to_string(),
                "Switch to the memory_optimized caching strategy".to_string(),
            ],
        ),
        BottleneckCategory::TextureBandwidth => (
            snapshot.slowest(Some(AssetKind::Texture)),
            vec![
                "Queue uncompressed textures for compression".to_string(),
                "Lower the target compression ratio for textures".to_string(),
            ],
        ),
        BottleneckCategory::PolygonCount => (
            snapshot.slowest(Some(AssetKind::Model)),
            vec![
                "Queue dense models for mesh simplification".to_string(),
                "Raise the target frame rate to simplify meshes further".to_string(),
            ],
        ),
    };

    BottleneckAnalysis {
        primary,
        severity,
        affected_operations,
        recommendations,
    }
}

pub fn report(snapshot: &DiagnosticsSnapshot) -> OptimizationReport {
    let bottlenecks = analyze(snapshot);
    let mut recommendations = Vec::new();

    if snapshot.memory.utilization > 80.0 {
        recommendations.push("Enable aggressive texture compression".to_string());
    }
    if snapshot.lookups > 0 && snapshot.cache_hit_rate < 50.0 {
        recommendations.push("Increase prefetch depth to raise the cache hit rate".to_string());
    }
    if snapshot.optimizations_completed > 0 && snapshot.average_compression_ratio > 0.8 {
        recommendations.push("Relax quality limits; optimizations save little memory".to_string());
    }
    if snapshot.texture_severity() > 0.5 {
        recommendations.push("Compress resident textures".to_string());
    }
    if snapshot.polygon_severity() > 0.5 {
        recommendations.push("Simplify high-polygon models".to_string());
    }

    let miss_penalty = if snapshot.lookups > 0 {
        1.0 - (snapshot.cache_hit_rate as f64 / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let render_penalty = snapshot.texture_severity().max(snapshot.polygon_severity());
    let system_health = (1.0
        - 0.5 * snapshot.memory_severity()
        - 0.25 * miss_penalty
        - 0.25 * render_penalty)
        .clamp(0.0, 1.0);

    OptimizationReport {
        memory: snapshot.memory,
        bottlenecks,
        cache_hit_rate: snapshot.cache_hit_rate,
        average_compression_ratio: snapshot.average_compression_ratio,
        optimizations_completed: snapshot.optimizations_completed,
        queued_optimizations: snapshot.queued_optimizations,
        recommendations,
        system_health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::metrics::Operation;
    use crate::model::ModelData;
    use crate::texture::TextureData;
    use crate::types::Priority;
    use std::time::Duration;

    fn resident(id: &str, payload: AssetPayload, mb: f64) -> Asset {
        Asset::new(id.to_string(), payload, mb, Priority::Normal, Vec::new())
    }

    fn sample(id: &str, kind: AssetKind, ms: u64) -> OperationSample {
        OperationSample {
            operation: Operation::Load,
            asset_id: id.to_string(),
            kind,
            duration: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_idle_system_is_healthy() {
        let report = report(&DiagnosticsSnapshot {
            average_compression_ratio: 1.0,
            ..DiagnosticsSnapshot::default()
        });
        assert_eq!(report.bottlenecks.primary, BottleneckCategory::Memory);
        assert_eq!(report.bottlenecks.severity, 0.0);
        assert_eq!(report.system_health, 1.0);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_texture_heavy_cache() {
        let snapshot = DiagnosticsSnapshot {
            memory: MemoryStats {
                used_mb: 40.0,
                max_mb: 200.0,
                utilization: 20.0,
                ..MemoryStats::default()
            },
            residents: vec![
                resident("skin", AssetPayload::Texture(TextureData::rgba8(8, 8)), 36.0),
                resident("body", AssetPayload::Model(ModelData::grid(2, 2)), 4.0),
            ],
            samples: vec![
                sample("body", AssetKind::Model, 90),
                sample("skin", AssetKind::Texture, 30),
            ],
            ..DiagnosticsSnapshot::default()
        };

        let analysis = analyze(&snapshot);
        assert_eq!(analysis.primary, BottleneckCategory::TextureBandwidth);
        assert!((analysis.severity - 0.9).abs() < 1e-9);
        assert_eq!(analysis.affected_operations.len(), 1);
        assert_eq!(analysis.affected_operations[0].asset_id, "skin");
    }

    #[test]
    fn test_high_utilization_recommends_compression() {
        let snapshot = DiagnosticsSnapshot {
            memory: MemoryStats {
                used_mb: 180.0,
                max_mb: 200.0,
                utilization: 90.0,
                ..MemoryStats::default()
            },
            ..DiagnosticsSnapshot::default()
        };
        let report = report(&snapshot);
        assert!(report
            .recommendations
            .contains(&"Enable aggressive texture compression".to_string()));
        assert!(report.system_health < 1.0);
        assert!((0.0..=1.0).contains(&report.system_health));
    }
}
