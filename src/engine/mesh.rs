use crate::error::GameError;

/// Interleaved vertex layout: position (3), color (3), uv (2).
pub const FLOATS_PER_VERTEX: usize = 8;

pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn cube(size: f32, r: f32, g: f32, b: f32) -> Self {
        let s = size / 2.0;
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let mut add_face = |
            x1: f32, y1: f32, z1: f32,
            x2: f32, y2: f32, z2: f32,
            x3: f32, y3: f32, z3: f32,
            x4: f32, y4: f32, z4: f32,
            brightness: f32
        | {
            let base = (vertices.len() / FLOATS_PER_VERTEX) as u16;
            let br = r * brightness;
            let bg = g * brightness;
            let bb = b * brightness;

            vertices.extend_from_slice(&[
                x1, y1, z1, br, bg, bb, 0.0, 0.0,
                x2, y2, z2, br, bg, bb, 1.0, 0.0,
                x3, y3, z3, br, bg, bb, 1.0, 1.0,
                x4, y4, z4, br, bg, bb, 0.0, 1.0,
            ]);

            indices.extend_from_slice(&[
                base, base + 1, base + 2,
                base, base + 2, base + 3,
            ]);
        };

        add_face(-s, -s, s, s, -s, s, s, s, s, -s, s, s, 0.9);
        add_face(s, -s, -s, -s, -s, -s, -s, s, -s, s, s, -s, 0.7);
        add_face(-s, s, s, s, s, s, s, s, -s, -s, s, -s, 1.1);
        add_face(-s, -s, -s, s, -s, -s, s, -s, s, -s, -s, s, 0.4);
        add_face(s, -s, s, s, -s, -s, s, s, -s, s, s, s, 0.8);
        add_face(-s, -s, -s, -s, -s, s, -s, s, s, -s, s, -s, 0.6);

        Mesh { vertices, indices }
    }

    pub fn from_gltf(bytes: &[u8]) -> Result<Self, GameError> {
        let (document, buffers, _) = gltf::import_slice(bytes)?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .ok_or_else(|| GameError::load("gltf", "primitive has no positions"))?
                    .collect();
                let colors: Vec<[f32; 3]> = if let Some(iter) = reader.read_colors(0) {
                    iter.into_rgb_f32().collect()
                } else {
                    vec![[1.0, 1.0, 1.0]; positions.len()]
                };

                let base_index = vertices.len() / FLOATS_PER_VERTEX;
                if base_index + positions.len() > u16::MAX as usize {
                    return Err(GameError::load("gltf", "mesh exceeds 16-bit index range"));
                }

                for (pos, color) in positions.iter().zip(colors.iter()) {
                    vertices.extend_from_slice(&[
                        pos[0], pos[1], pos[2],
                        color[0], color[1], color[2],
                        0.0, 0.0,
                    ]);
                }

                if let Some(iter) = reader.read_indices() {
                    for index in iter.into_u32() {
                        indices.push((base_index + index as usize) as u16);
                    }
                } else {
                    // Non-indexed primitive: vertices are already triangle soup.
                    indices.extend((0..positions.len()).map(|i| (base_index + i) as u16));
                }
            }
        }

        Ok(Mesh { vertices, indices })
    }

    /// Line-list positions (x, y, z per point) tracing every triangle edge,
    /// used to draw the wireframe twin of a model.
    pub fn edge_lines(&self) -> Vec<f32> {
        let mut lines = Vec::with_capacity(self.indices.len() * 6);
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                lines.extend_from_slice(self.position(a as usize));
                lines.extend_from_slice(self.position(b as usize));
            }
        }
        lines
    }

    fn position(&self, index: usize) -> &[f32] {
        let start = index * FLOATS_PER_VERTEX;
        &self.vertices[start..start + 3]
    }
}
