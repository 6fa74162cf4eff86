use crate::{
    data::LoadedModel,
    opengl::{vec3_pair_layouts, RenderData},
    renderer::RenderError,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 6
    }

    fn push_vertex(&mut self, a: [f32; 3], b: [f32; 3]) {
        self.vertices.extend_from_slice(&a);
        self.vertices.extend_from_slice(&b);
    }

    pub fn upload(&self, gl: &glow::Context) -> Result<RenderData, RenderError> {
        RenderData::new(gl, &self.vertices, &self.indices, vec3_pair_layouts())
    }
}

/// Unit cube centred on the origin, one quad per face so normals stay flat.
pub fn cube() -> MeshData {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, u axis, v axis
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut mesh = MeshData::default();
    for (normal, u, v) in FACES {
        let base = mesh.vertex_count() as u32;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let position = [
                normal[0] * 0.5 + u[0] * su + v[0] * sv,
                normal[1] * 0.5 + u[1] * su + v[1] * sv,
                normal[2] * 0.5 + u[2] * su + v[2] * sv,
            ];
            mesh.push_vertex(position, normal);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    mesh
}

pub fn plane() -> MeshData {
    let mut mesh = MeshData::default();
    let up = [0.0, 1.0, 0.0];
    for (x, z) in [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)] {
        mesh.push_vertex([x, 0.0, z], up);
    }
    mesh.indices = vec![0, 1, 2, 2, 3, 0];
    mesh
}

pub fn axes() -> MeshData {
    let mut mesh = MeshData::default();
    let origin = [0.0, 0.0, 0.0];
    for axis in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] {
        mesh.push_vertex(origin, axis);
        mesh.push_vertex(axis, axis);
    }
    mesh
}

pub const MAX_GRID_DIVISIONS: u32 = 1000;

pub fn grid(divisions: u32) -> MeshData {
    let divisions = divisions.clamp(1, MAX_GRID_DIVISIONS);
    let centre = [0.27, 0.27, 0.27];
    let line = [0.53, 0.53, 0.53];

    let mut mesh = MeshData::default();
    for i in 0..=divisions {
        let t = i as f32 / divisions as f32 - 0.5;
        let color = if t.abs() < f32::EPSILON { centre } else { line };
        mesh.push_vertex([t, 0.0, -0.5], color);
        mesh.push_vertex([t, 0.0, 0.5], color);
        mesh.push_vertex([-0.5, 0.0, t], color);
        mesh.push_vertex([0.5, 0.0, t], color);
    }
    mesh
}

#[derive(Debug)]
pub struct GpuPrimitive {
    pub render_data: RenderData,
    pub base_color: [f32; 4],
}

#[derive(Debug)]
pub struct GpuMesh {
    pub name: String,
    pub primitives: Vec<GpuPrimitive>,
}

impl GpuMesh {
    pub fn from_data(
        gl: &glow::Context,
        name: &str,
        data: &MeshData,
        base_color: [f32; 4],
    ) -> Result<Self, RenderError> {
        Ok(Self {
            name: name.to_string(),
            primitives: vec![GpuPrimitive {
                render_data: data.upload(gl)?,
                base_color,
            }],
        })
    }

    pub fn from_model(gl: &glow::Context, model: &LoadedModel) -> Result<Self, RenderError> {
        let mut primitives = Vec::with_capacity(model.primitives.len());

        for primitive in &model.primitives {
            let data = MeshData {
                vertices: primitive.vertex_data.interleaved(),
                indices: primitive.indices.clone().unwrap_or_default(),
            };
            primitives.push(GpuPrimitive {
                render_data: data.upload(gl)?,
                base_color: primitive.base_color,
            });
        }

        Ok(Self {
            name: model.name.clone(),
            primitives,
        })
    }

    pub fn delete(&self, gl: &glow::Context) {
        for primitive in &self.primitives {
            primitive.render_data.delete(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_flat_faces() {
        let cube = cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.indices.len(), 36);

        for vertex in cube.vertices.chunks(6) {
            let (position, normal) = vertex.split_at(3);
            // Every vertex sits on the face its normal points out of.
            let along: f32 = position.iter().zip(normal).map(|(p, n)| p * n).sum();
            assert!((along - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn grid_line_count_follows_divisions() {
        assert_eq!(grid(10).vertex_count(), 11 * 4);
        assert_eq!(grid(0).vertex_count(), 2 * 4);
        assert_eq!(
            grid(u32::MAX).vertex_count(),
            (MAX_GRID_DIVISIONS as usize + 1) * 4
        );
    }

    #[test]
    fn axes_are_lines_without_indices() {
        let axes = axes();
        assert_eq!(axes.vertex_count(), 6);
        assert!(axes.indices.is_empty());
        assert_eq!(plane().indices, vec![0, 1, 2, 2, 3, 0]);
    }
}
