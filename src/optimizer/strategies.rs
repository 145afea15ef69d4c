//! Type-specific payload transforms
//!
//! Every function here is pure and CPU-bound; the engine runs them on a
//! blocking worker. A step is applied only if it shrinks the size estimate.

use crate::animation::AnimationData;
use crate::asset::AssetPayload;
use crate::lod::MeshSimplifier;
use crate::model::{ModelData, VertexFormat};
use crate::texture::{TextureData, TextureFormat};

use super::{OptimizationKind, OptimizationTargets, PerformanceTarget};

/// Fraction of the target memory one texture may occupy before it is resized
pub const TEXTURE_MEMORY_SHARE: f64 = 0.02;

/// Smallest edge a resized texture keeps
pub const MIN_TEXTURE_DIMENSION: u32 = 64;

/// Models above this triangle count are simplified
pub const SIMPLIFY_TRIANGLE_THRESHOLD: usize = 10_000;

/// Frame rate at or above which meshes are simplified more aggressively
pub const HIGH_FPS: f32 = 60.0;

/// Keyframe tolerance per unit of allowed quality loss
pub const KEYFRAME_TOLERANCE_SCALE: f32 = 0.05;

/// A rewritten payload and the steps that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub payload: AssetPayload,
    pub applied: Vec<OptimizationKind>,
}

/// Parameters shared by every transform
#[derive(Debug, Clone, Copy)]
pub struct TransformContext {
    pub targets: OptimizationTargets,
    pub target: PerformanceTarget,
    /// Declared footprint of the payload being transformed
    pub footprint_mb: f64,
}

impl TransformContext {
    /// Declared MB per estimated byte, used to predict new footprints
    fn mb_per_byte(&self, estimated_bytes: usize) -> Option<f64> {
        (estimated_bytes > 0).then(|| self.footprint_mb / estimated_bytes as f64)
    }
}

pub fn transform(
    payload: &AssetPayload,
    ctx: &TransformContext,
    simplifier: &dyn MeshSimplifier,
) -> Transformed {
    match payload {
        AssetPayload::Texture(texture) => {
            let (texture, applied) = optimize_texture(texture, ctx);
            Transformed {
                payload: AssetPayload::Texture(texture),
                applied,
            }
        }
        AssetPayload::Model(model) => {
            let (model, applied) = optimize_model(model, ctx, simplifier);
            Transformed {
                payload: AssetPayload::Model(model),
                applied,
            }
        }
        AssetPayload::Animation(animation) => {
            let (animation, applied) = optimize_animation(animation, ctx);
            Transformed {
                payload: AssetPayload::Animation(animation),
                applied,
            }
        }
    }
}

/// Number of halvings needed to bring `predicted_mb` within `budget_mb`
fn resize_levels(width: u32, height: u32, mut predicted_mb: f64, budget_mb: f64) -> u32 {
    let (mut w, mut h) = (width, height);
    let mut levels = 0;
    while predicted_mb > budget_mb
        && w / 2 >= MIN_TEXTURE_DIMENSION
        && h / 2 >= MIN_TEXTURE_DIMENSION
    {
        w /= 2;
        h /= 2;
        predicted_mb /= 4.0;
        levels += 1;
    }
    levels
}

pub fn optimize_texture(
    texture: &TextureData,
    ctx: &TransformContext,
) -> (TextureData, Vec<OptimizationKind>) {
    let format = if texture.format.is_compressed() {
        None
    } else {
        TextureFormat::recommended(
            ctx.targets.target_compression_ratio,
            ctx.targets.max_quality_loss,
        )
    };

    // Resize first so resampling sees full-precision pixels
    let mut current = texture.clone();
    let mut applied = Vec::new();

    if let Some(mb_per_byte) = ctx.mb_per_byte(texture.estimated_size()) {
        let bpp = format
            .map_or(texture.format, |f| texture.encoded_format(f))
            .bits_per_pixel() as f64;
        let predicted_mb = texture.estimated_size() as f64 * mb_per_byte * bpp
            / texture.format.bits_per_pixel() as f64;
        let budget_mb = ctx.target.max_memory_mb * TEXTURE_MEMORY_SHARE;
        let levels = resize_levels(texture.width, texture.height, predicted_mb, budget_mb);
        if levels > 0 {
            let resized = current.downscaled(levels, MIN_TEXTURE_DIMENSION);
            if resized.estimated_size() < current.estimated_size() {
                current = resized;
                applied.push(OptimizationKind::TextureResize);
            }
        }
    }

    if let Some(format) = format {
        let encoded = current.encoded(format);
        if encoded.estimated_size() < current.estimated_size() {
            current = encoded;
            applied.insert(0, OptimizationKind::TextureCompression);
        }
    }

    (current, applied)
}

pub fn optimize_model(
    model: &ModelData,
    ctx: &TransformContext,
    simplifier: &dyn MeshSimplifier,
) -> (ModelData, Vec<OptimizationKind>) {
    let mut current = model.clone();
    let mut applied = Vec::new();

    if model.triangle_count() > SIMPLIFY_TRIANGLE_THRESHOLD {
        let ratio = if ctx.target.target_fps >= HIGH_FPS {
            0.5
        } else {
            0.75
        };
        let simplified = simplifier.simplify(&current, ratio, ctx.targets.max_quality_loss);
        if simplified.estimated_size() < current.estimated_size() {
            log::debug!(
                "{} simplifier reduced {} triangles to {}",
                simplifier.name(),
                current.triangle_count(),
                simplified.triangle_count()
            );
            current = simplified;
            applied.push(OptimizationKind::MeshSimplification);
        }
    }

    if current.vertex_format == VertexFormat::Float32 {
        let quantized = current.quantized();
        if quantized.estimated_size() < current.estimated_size() {
            current = quantized;
            applied.push(OptimizationKind::VertexCompression);
        }
    }

    (current, applied)
}

pub fn optimize_animation(
    animation: &AnimationData,
    ctx: &TransformContext,
) -> (AnimationData, Vec<OptimizationKind>) {
    if animation.compressed {
        return (animation.clone(), Vec::new());
    }

    let tolerance = ctx.targets.max_quality_loss * KEYFRAME_TOLERANCE_SCALE;
    let reduced = animation.reduced(tolerance);
    if reduced.estimated_size() < animation.estimated_size() {
        (reduced, vec![OptimizationKind::KeyframeReduction])
    } else {
        (animation.clone(), Vec::new())
    }
}
