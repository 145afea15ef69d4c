//! Mesh simplification for model optimization
//!
//! The optimizer reduces dense meshes through a [`MeshSimplifier`]. The
//! default implementation clusters vertices on a uniform grid; enable the
//! `lod` feature for the `meshopt` edge-collapse simplifier.

use std::collections::HashMap;

use crate::model::ModelData;

/// Trait for mesh simplification algorithms
pub trait MeshSimplifier: Send + Sync {
    /// Simplify `model` to roughly `target_ratio` of its triangles.
    ///
    /// `max_error` bounds how far any vertex may move, as a fraction of the
    /// bounding box diagonal. Implementations stop short of the target
    /// rather than exceed it, and return an unchanged copy when nothing can
    /// be removed.
    fn simplify(&self, model: &ModelData, target_ratio: f32, max_error: f32) -> ModelData;

    /// Create a boxed clone of the simplifier
    fn box_clone(&self) -> Box<dyn MeshSimplifier>;

    fn name(&self) -> &'static str;
}

impl Clone for Box<dyn MeshSimplifier> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl std::fmt::Debug for dyn MeshSimplifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Growth factor between clustering attempts
const CELL_GROWTH: f32 = 1.4;

/// Vertex clustering simplifier
///
/// Snaps vertices to a uniform grid and merges each occupied cell into one
/// averaged vertex. Averages stay inside their cell, so a cell edge of
/// `max_error * diagonal / sqrt(3)` bounds the displacement. The cell grows
/// until the triangle target is met or that bound is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSimplifier;

impl DefaultSimplifier {
    /// Create a new default simplifier
    pub fn new() -> Self {
        Self
    }

    fn cluster(model: &ModelData, lo: [f32; 3], cell: f32) -> ModelData {
        let key = |p: &[f32; 3]| -> (i32, i32, i32) {
            (
                ((p[0] - lo[0]) / cell).floor() as i32,
                ((p[1] - lo[1]) / cell).floor() as i32,
                ((p[2] - lo[2]) / cell).floor() as i32,
            )
        };

        #[derive(Default)]
        struct Cluster {
            position: [f32; 3],
            normal: [f32; 3],
            uv: [f32; 2],
            count: f32,
        }

        let mut slots: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut remap = Vec::with_capacity(model.vertex_count());

        for (i, p) in model.positions.iter().enumerate() {
            let slot = *slots.entry(key(p)).or_insert_with(|| {
                clusters.push(Cluster::default());
                (clusters.len() - 1) as u32
            });
            let cluster = &mut clusters[slot as usize];
            for axis in 0..3 {
                cluster.position[axis] += p[axis];
            }
            if let Some(n) = model.normals.get(i) {
                for axis in 0..3 {
                    cluster.normal[axis] += n[axis];
                }
            }
            if let Some(uv) = model.uvs.get(i) {
                cluster.uv[0] += uv[0];
                cluster.uv[1] += uv[1];
            }
            cluster.count += 1.0;
            remap.push(slot);
        }

        let mut indices = Vec::with_capacity(model.indices.len());
        for tri in model.indices.chunks_exact(3) {
            let lookup = |n: usize| remap.get(tri[n] as usize).copied();
            let (Some(a), Some(b), Some(c)) = (lookup(0), lookup(1), lookup(2)) else {
                continue;
            };
            if a != b && b != c && a != c {
                indices.extend_from_slice(&[a, b, c]);
            }
        }

        let positions = clusters
            .iter()
            .map(|c| c.position.map(|v| v / c.count))
            .collect();
        let normals = if model.normals.is_empty() {
            Vec::new()
        } else {
            clusters
                .iter()
                .map(|c| {
                    let n = glam::Vec3::from(c.normal).normalize_or_zero();
                    n.to_array()
                })
                .collect()
        };
        let uvs = if model.uvs.is_empty() {
            Vec::new()
        } else {
            clusters
                .iter()
                .map(|c| [c.uv[0] / c.count, c.uv[1] / c.count])
                .collect()
        };

        ModelData {
            name: model.name.clone(),
            positions,
            normals,
            uvs,
            indices,
            vertex_format: model.vertex_format,
        }
    }
}

impl MeshSimplifier for DefaultSimplifier {
    fn simplify(&self, model: &ModelData, target_ratio: f32, max_error: f32) -> ModelData {
        let diagonal = model.bounding_diagonal();
        let triangles = model.triangle_count();
        let Some((lo, _)) = model.bounds() else {
            return model.clone();
        };
        if diagonal <= 0.0 || triangles == 0 || target_ratio >= 1.0 {
            return model.clone();
        }

        let target = ((triangles as f32) * target_ratio.max(0.0)).ceil() as usize;
        let max_cell = max_error.max(0.0) * diagonal / 3f32.sqrt();
        let mut cell = diagonal / (model.vertex_count() as f32).sqrt();
        if cell > max_cell {
            return model.clone();
        }

        let mut best = None;
        while cell <= max_cell {
            let candidate = Self::cluster(model, lo, cell);
            let done = candidate.triangle_count() <= target;
            best = Some(candidate);
            if done {
                break;
            }
            cell *= CELL_GROWTH;
        }

        match best {
            Some(simplified) if simplified.triangle_count() < triangles => simplified,
            _ => model.clone(),
        }
    }

    fn box_clone(&self) -> Box<dyn MeshSimplifier> {
        Box::new(*self)
    }

    fn name(&self) -> &'static str {
        "vertex-clustering"
    }
}

/// Meshopt-based simplifier
#[cfg(feature = "lod")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshoptSimplifier;

#[cfg(feature = "lod")]
impl MeshoptSimplifier {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "lod")]
impl MeshSimplifier for MeshoptSimplifier {
    fn simplify(&self, model: &ModelData, target_ratio: f32, max_error: f32) -> ModelData {
        use meshopt::{SimplifyOptions, VertexDataAdapter};

        if model.indices.is_empty() || target_ratio >= 1.0 {
            return model.clone();
        }
        let vertex_count = model.vertex_count();
        if model.indices.iter().any(|&i| i as usize >= vertex_count) {
            log::warn!("Skipping simplification of mesh with out-of-range indices");
            return model.clone();
        }

        let position_bytes: &[u8] = bytemuck::cast_slice(&model.positions);
        let adapter = match VertexDataAdapter::new(
            position_bytes,
            std::mem::size_of::<[f32; 3]>(),
            0,
        ) {
            Ok(adapter) => adapter,
            Err(err) => {
                log::warn!("meshopt rejected vertex data: {err:?}");
                return model.clone();
            }
        };

        let target_index_count = ((model.indices.len() as f32 * target_ratio) as usize / 3) * 3;
        let simplified = meshopt::simplify(
            &model.indices,
            &adapter,
            target_index_count.max(3),
            max_error,
            SimplifyOptions::empty(),
            None,
        );
        if simplified.len() >= model.indices.len() {
            return model.clone();
        }

        // Compact to the vertices still referenced, in first-use order
        let mut remap: Vec<Option<u32>> = vec![None; model.vertex_count()];
        let mut kept = Vec::new();
        let indices = simplified
            .iter()
            .map(|&old| {
                *remap[old as usize].get_or_insert_with(|| {
                    kept.push(old as usize);
                    (kept.len() - 1) as u32
                })
            })
            .collect();

        let pick = |i: &usize| model.positions[*i];
        ModelData {
            name: model.name.clone(),
            positions: kept.iter().map(pick).collect(),
            normals: kept
                .iter()
                .filter_map(|&i| model.normals.get(i).copied())
                .collect(),
            uvs: kept.iter().filter_map(|&i| model.uvs.get(i).copied()).collect(),
            indices,
            vertex_format: model.vertex_format,
        }
    }

    fn box_clone(&self) -> Box<dyn MeshSimplifier> {
        Box::new(*self)
    }

    fn name(&self) -> &'static str {
        "meshopt"
    }
}

/// The best simplifier compiled in
pub fn default_simplifier() -> Box<dyn MeshSimplifier> {
    #[cfg(feature = "lod")]
    {
        Box::new(MeshoptSimplifier::new())
    }
    #[cfg(not(feature = "lod"))]
    {
        Box::new(DefaultSimplifier::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_displacement(original: &ModelData, simplified: &ModelData) -> f32 {
        // Every original vertex lies within this distance of some kept vertex
        original
            .positions
            .iter()
            .map(|p| {
                simplified
                    .positions
                    .iter()
                    .map(|q| glam::Vec3::from(*p).distance(glam::Vec3::from(*q)))
                    .fold(f32::INFINITY, f32::min)
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_clustering_reaches_target() {
        let grid = ModelData::grid(50, 150);
        let simplified = DefaultSimplifier::new().simplify(&grid, 0.5, 0.1);

        assert!(simplified.triangle_count() <= grid.triangle_count() / 2);
        assert!(simplified.triangle_count() > 0);
        assert!(simplified.vertex_count() < grid.vertex_count());
        assert_eq!(simplified.normals.len(), simplified.vertex_count());
        assert!(simplified
            .indices
            .iter()
            .all(|&i| (i as usize) < simplified.vertex_count()));
    }

    #[test]
    fn test_error_bound_is_respected() {
        let grid = ModelData::grid(40, 40);
        let max_error = 0.05;
        let simplified = DefaultSimplifier::new().simplify(&grid, 0.1, max_error);
        let bound = max_error * grid.bounding_diagonal();
        assert!(simplified.triangle_count() < grid.triangle_count());
        assert!(max_displacement(&grid, &simplified) <= bound + 1e-3);
    }

    #[test]
    fn test_zero_error_keeps_mesh() {
        let grid = ModelData::grid(10, 10);
        let simplified = DefaultSimplifier::new().simplify(&grid, 0.5, 0.0);
        assert_eq!(simplified, grid);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let mut grid = ModelData::grid(40, 40);
        let bogus = grid.vertex_count() as u32 + 7;
        grid.indices.extend_from_slice(&[0, 1, bogus]);

        let simplified = DefaultSimplifier::new().simplify(&grid, 0.5, 0.1);
        assert!(simplified.triangle_count() < grid.triangle_count());
        assert!(simplified
            .indices
            .iter()
            .all(|&i| (i as usize) < simplified.vertex_count()));

        // meshopt refuses the mesh outright
        let fallback = default_simplifier().simplify(&grid, 0.5, 0.1);
        assert!(
            fallback == grid
                || fallback
                    .indices
                    .iter()
                    .all(|&i| (i as usize) < fallback.vertex_count())
        );
    }

    #[test]
    fn test_degenerate_input() {
        let empty = ModelData::default();
        assert_eq!(DefaultSimplifier::new().simplify(&empty, 0.5, 0.1), empty);
    }

    #[test]
    fn test_boxed_clone_keeps_name() {
        let boxed: Box<dyn MeshSimplifier> = Box::new(DefaultSimplifier::new());
        assert_eq!(boxed.clone().name(), "vertex-clustering");
    }
}
