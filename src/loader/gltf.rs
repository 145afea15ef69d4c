//! GLTF/GLB decoding into model and animation payloads
//!
//! Every triangle primitive of every mesh is merged into one indexed
//! triangle list; materials and scene hierarchy are not kept.

use ::gltf::animation::util::ReadOutputs;
use ::gltf::mesh::Mode;
use glam::Vec4;

use super::{BackendError, BackendResult};
use crate::animation::{AnimationChannel, AnimationData, ChannelProperty, Keyframe};
use crate::model::ModelData;

/// Load a GLB from bytes as a single merged mesh
pub fn load_glb_model(data: &[u8]) -> BackendResult<ModelData> {
    let (document, buffers, _images) = ::gltf::import_slice(data)?;
    let mut model = ModelData::default();

    for mesh in document.meshes() {
        if model.name.is_none() {
            model.name = mesh.name().map(str::to_string);
        }

        for (prim_idx, primitive) in mesh.primitives().enumerate() {
            if primitive.mode() != Mode::Triangles {
                log::warn!("Skipping non-triangle primitive {prim_idx}");
                continue;
            }

            let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                log::warn!("Primitive {prim_idx} has no positions");
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let base = model.positions.len() as u32;
            let count = positions.len();

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_else(|| vec![[0.0, 0.0, 1.0]; count]);
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; count]);
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..count as u32).collect());

            log::debug!(
                "  - Primitive {prim_idx}: {count} vertices, {} indices",
                indices.len()
            );

            model.positions.extend(positions);
            model.normals.extend(normals);
            model.uvs.extend(uvs);
            model.indices.extend(indices.into_iter().map(|i| i + base));
        }
    }

    if model.positions.is_empty() {
        return Err(BackendError::Unsupported(
            "GLB contains no triangle geometry".to_string(),
        ));
    }
    Ok(model)
}

/// Load the first animation of a GLB
pub fn load_glb_animation(data: &[u8]) -> BackendResult<AnimationData> {
    let (document, buffers, _images) = ::gltf::import_slice(data)?;
    let animation = document
        .animations()
        .next()
        .ok_or_else(|| BackendError::Unsupported("GLB contains no animation".to_string()))?;

    let mut clip = AnimationData {
        name: animation.name().map(str::to_string),
        ..Default::default()
    };

    for channel in animation.channels() {
        let reader = channel.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
        let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();

        let (property, values): (ChannelProperty, Vec<Vec4>) = match outputs {
            ReadOutputs::Translations(it) => (
                ChannelProperty::Translation,
                it.map(|t| Vec4::new(t[0], t[1], t[2], 0.0)).collect(),
            ),
            ReadOutputs::Rotations(it) => (
                ChannelProperty::Rotation,
                it.into_f32().map(Vec4::from_array).collect(),
            ),
            ReadOutputs::Scales(it) => (
                ChannelProperty::Scale,
                it.map(|s| Vec4::new(s[0], s[1], s[2], 0.0)).collect(),
            ),
            ReadOutputs::MorphTargetWeights(_) => continue,
        };

        // Cubic spline outputs carry tangents; only linear/step keys map 1:1
        if values.len() != times.len() {
            log::debug!("Skipping channel with {} outputs for {} inputs", values.len(), times.len());
            continue;
        }

        if let Some(&last) = times.last() {
            clip.duration = clip.duration.max(last);
        }
        clip.channels.push(AnimationChannel {
            target_node: channel.target().node().index(),
            property,
            keyframes: times
                .into_iter()
                .zip(values)
                .map(|(time, value)| Keyframe { time, value })
                .collect(),
        });
    }

    if clip.channels.is_empty() {
        log::warn!("Animation {:?} has no usable channels", clip.name);
    }
    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_glb_model_empty() {
        let result = load_glb_model(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_glb_animation_garbage() {
        let result = load_glb_animation(b"not a glb");
        assert!(matches!(result, Err(BackendError::Gltf(_))));
    }
}
