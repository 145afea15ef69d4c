//! Model payloads: indexed triangle meshes

/// Storage precision of vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexFormat {
    /// position, normal and uv as 32-bit floats
    #[default]
    Float32,
    /// 16-bit quantized positions and uvs, octahedral 8-bit normals
    Quantized16,
}

impl VertexFormat {
    /// Bytes occupied by one vertex
    pub fn stride(&self) -> usize {
        match self {
            // 3 + 3 + 2 floats
            Self::Float32 => 32,
            // 3 x u16 position, 2 x i8 normal, 2 x u16 uv, padded to 4
            Self::Quantized16 => 16,
        }
    }
}

/// A decoded triangle mesh
///
/// `indices` is a triangle list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelData {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub vertex_format: VertexFormat,
}

impl ModelData {
    pub fn new(
        name: Option<String>,
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            name,
            positions,
            normals,
            uvs,
            indices,
            vertex_format: VertexFormat::Float32,
        }
    }

    /// Flat grid of `cols` x `rows` quads in the XY plane, two triangles each
    pub fn grid(cols: u32, rows: u32) -> Self {
        let mut positions = Vec::with_capacity(((cols + 1) * (rows + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());
        for y in 0..=rows {
            for x in 0..=cols {
                positions.push([x as f32, y as f32, 0.0]);
                uvs.push([x as f32 / cols.max(1) as f32, y as f32 / rows.max(1) as f32]);
            }
        }
        let normals = vec![[0.0, 0.0, 1.0]; positions.len()];

        let stride = cols + 1;
        let mut indices = Vec::with_capacity((cols * rows * 6) as usize);
        for y in 0..rows {
            for x in 0..cols {
                let i = y * stride + x;
                indices.extend_from_slice(&[i, i + 1, i + stride]);
                indices.extend_from_slice(&[i + 1, i + stride + 1, i + stride]);
            }
        }

        Self::new(Some("grid".to_string()), positions, normals, uvs, indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Width of one index in bytes
    pub fn index_width(&self) -> usize {
        if self.vertex_format == VertexFormat::Quantized16 && self.vertex_count() < 65_536 {
            2
        } else {
            4
        }
    }

    /// Get the estimated size of this mesh in bytes
    pub fn estimated_size(&self) -> usize {
        self.vertex_count() * self.vertex_format.stride() + self.indices.len() * self.index_width()
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(mut lo, mut hi), p| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
            (lo, hi)
        }))
    }

    /// Length of the bounding box diagonal
    pub fn bounding_diagonal(&self) -> f32 {
        match self.bounds() {
            Some((lo, hi)) => {
                let d = [hi[0] - lo[0], hi[1] - lo[1], hi[2] - lo[2]];
                (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
            }
            None => 0.0,
        }
    }

    /// Quantize vertex attributes to 16 bits.
    ///
    /// Positions and uvs each snap to a 65 535-step lattice over their own
    /// bounds, so the stored floats are exactly what a 16-bit vertex buffer
    /// decodes to. Tiled uvs outside [0, 1] keep their range.
    pub fn quantized(&self) -> ModelData {
        let Some((lo, hi)) = self.bounds() else {
            return ModelData {
                vertex_format: VertexFormat::Quantized16,
                ..self.clone()
            };
        };

        let positions: Vec<[f32; 3]> = self
            .positions
            .iter()
            .map(|p| std::array::from_fn(|axis| snap16(p[axis], lo[axis], hi[axis])))
            .collect();

        let uvs: Vec<[f32; 2]> = match uv_bounds(&self.uvs) {
            Some((uv_lo, uv_hi)) => self
                .uvs
                .iter()
                .map(|uv| std::array::from_fn(|axis| snap16(uv[axis], uv_lo[axis], uv_hi[axis])))
                .collect(),
            None => Vec::new(),
        };

        ModelData {
            name: self.name.clone(),
            positions,
            normals: self.normals.clone(),
            uvs,
            indices: self.indices.clone(),
            vertex_format: VertexFormat::Quantized16,
        }
    }
}

fn snap16(value: f32, lo: f32, hi: f32) -> f32 {
    const STEPS: f32 = 65_535.0;
    let extent = hi - lo;
    if extent > 0.0 {
        lo + ((value - lo) / extent * STEPS).round() / STEPS * extent
    } else {
        value
    }
}

fn uv_bounds(uvs: &[[f32; 2]]) -> Option<([f32; 2], [f32; 2])> {
    let first = *uvs.first()?;
    Some(uvs.iter().fold((first, first), |(mut lo, mut hi), uv| {
        for axis in 0..2 {
            lo[axis] = lo[axis].min(uv[axis]);
            hi[axis] = hi[axis].max(uv[axis]);
        }
        (lo, hi)
    }))
}
