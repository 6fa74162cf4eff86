use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cgmath::{vec3, InnerSpace, Matrix4, Vector3};
use glow::HasContext;

use crate::{
    camera::PerspectiveCamera,
    data::LoadedModel,
    handles::{MeshHandle, MeshSlot},
    mesh::{self, GpuMesh},
    opengl::RenderData,
    scene::{LightKind, NodeKind, SceneGraph},
    shaders::{ShaderProgram, LINE_FRAGMENT, LINE_VERTEX, LIT_FRAGMENT, LIT_VERTEX},
    viewport::Viewport,
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to compile {stage} shader of {name}: {log}")]
    Shader {
        name: &'static str,
        stage: &'static str,
        log: String,
    },

    #[error("failed to link shader program {name}: {log}")]
    Link { name: &'static str, log: String },

    #[error("OpenGL resource allocation failed: {0}")]
    Resource(String),
}

pub trait Renderer {
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    pub ambient: [f32; 3],
    pub sun_direction: Vector3<f32>,
    pub sun_color: [f32; 3],
    pub point_position: Vector3<f32>,
    pub point_color: [f32; 3],
}

impl LightRig {
    /// Ambient lights add up; the first directional and the first point
    /// light are used, any further ones are ignored.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let mut rig = Self {
            ambient: [0.0; 3],
            sun_direction: vec3(0.0, 1.0, 0.0),
            sun_color: [0.0; 3],
            point_position: vec3(0.0, 0.0, 0.0),
            point_color: [0.0; 3],
        };
        let mut have_sun = false;
        let mut have_point = false;

        for node in scene.nodes().iter().filter(|n| n.visible) {
            let NodeKind::Light(light) = &node.kind else {
                continue;
            };
            let color = light.color.map(|c| c * light.intensity);

            match light.kind {
                LightKind::Ambient => {
                    for (sum, c) in rig.ambient.iter_mut().zip(color) {
                        *sum += c;
                    }
                }
                LightKind::Directional if !have_sun => {
                    let towards = node.transform.translation;
                    if towards.magnitude2() > f32::EPSILON {
                        rig.sun_direction = towards.normalize();
                    }
                    rig.sun_color = color;
                    have_sun = true;
                }
                LightKind::Point if !have_point => {
                    rig.point_position = node.transform.translation;
                    rig.point_color = color;
                    have_point = true;
                }
                _ => {}
            }
        }

        rig
    }
}

pub fn grid_divisions(scene: &SceneGraph) -> HashSet<u32> {
    scene
        .nodes()
        .iter()
        .filter_map(|node| match node.kind {
            NodeKind::Grid { divisions, .. } => Some(divisions),
            _ => None,
        })
        .collect()
}

pub fn mesh_slot(kind: &NodeKind, model: Option<MeshHandle>) -> Option<MeshSlot> {
    match kind {
        NodeKind::Model => model.map(MeshSlot::Model),
        NodeKind::Cube { .. } => Some(MeshSlot::Cube),
        NodeKind::Ground { .. } => Some(MeshSlot::Ground),
        NodeKind::Light(_) | NodeKind::Axes { .. } | NodeKind::Grid { .. } => None,
    }
}

pub struct GlowRenderer {
    gl: Arc<glow::Context>,
    viewport: Viewport,

    lit: ShaderProgram,
    lines: ShaderProgram,

    cube: GpuMesh,
    ground: GpuMesh,
    axes: RenderData,
    grids: HashMap<u32, RenderData>,

    models: Vec<GpuMesh>,
    active_model: Option<MeshHandle>,
}

impl GlowRenderer {
    pub fn new(gl: Arc<glow::Context>, viewport: Viewport) -> Result<Self, RenderError> {
        let lit = ShaderProgram::compile(&gl, "lit", LIT_VERTEX, LIT_FRAGMENT)?;
        let lines = ShaderProgram::compile(&gl, "line", LINE_VERTEX, LINE_FRAGMENT)?;

        let cube = GpuMesh::from_data(&gl, "Cube", &mesh::cube(), [1.0; 4])?;
        let ground = GpuMesh::from_data(&gl, "Ground", &mesh::plane(), [1.0; 4])?;
        let axes = mesh::axes().upload(&gl)?;

        Ok(Self {
            gl,
            viewport,
            lit,
            lines,
            cube,
            ground,
            axes,
            grids: HashMap::new(),
            models: Vec::new(),
            active_model: None,
        })
    }

    pub fn upload_model(&mut self, model: &LoadedModel) -> Result<MeshHandle, RenderError> {
        let mesh = GpuMesh::from_model(&self.gl, model)?;
        let handle = MeshHandle(self.models.len());

        log::info!(
            "Uploaded {} ({} primitives, {} vertices)",
            model.name,
            mesh.primitives.len(),
            model.vertex_count()
        );

        self.models.push(mesh);
        self.active_model = Some(handle);
        Ok(handle)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn mesh(&self, slot: MeshSlot) -> Option<&GpuMesh> {
        match slot {
            MeshSlot::Cube => Some(&self.cube),
            MeshSlot::Ground => Some(&self.ground),
            MeshSlot::Model(handle) => self.models.get(handle.0),
        }
    }

    fn sync_grids(&mut self, scene: &SceneGraph) {
        let wanted = grid_divisions(scene);

        let gl = &self.gl;
        self.grids.retain(|divisions, data| {
            let keep = wanted.contains(divisions);
            if !keep {
                data.delete(gl);
            }
            keep
        });

        for divisions in wanted {
            if self.grids.contains_key(&divisions) {
                continue;
            }
            match mesh::grid(divisions).upload(gl) {
                Ok(data) => {
                    self.grids.insert(divisions, data);
                }
                Err(e) => log::error!("Could not create grid with {} divisions: {}", divisions, e),
            }
        }
    }

    fn draw_lit(&self, scene: &SceneGraph, view_projection: &Matrix4<f32>) {
        let gl = &self.gl;
        let rig = LightRig::from_scene(scene);

        self.lit.bind(gl);
        self.lit.set_vec3(gl, "u_ambient", rig.ambient);
        self.lit.set_vec3(gl, "u_sun_direction", rig.sun_direction.into());
        self.lit.set_vec3(gl, "u_sun_color", rig.sun_color);
        self.lit.set_vec3(gl, "u_point_position", rig.point_position.into());
        self.lit.set_vec3(gl, "u_point_color", rig.point_color);

        for node in scene.nodes().iter().filter(|n| n.visible) {
            let Some(slot) = mesh_slot(&node.kind, self.active_model) else {
                continue;
            };
            let Some(mesh) = self.mesh(slot) else {
                continue;
            };

            let (size, tint) = match &node.kind {
                NodeKind::Cube { size, color } | NodeKind::Ground { size, color } => {
                    (*size, Some(*color))
                }
                _ => (1.0, None),
            };

            let model = node.transform.model_matrix() * Matrix4::from_scale(size);
            self.lit.set_mat4(gl, "u_model", &model);
            self.lit.set_mat4(gl, "u_mvp", &(*view_projection * model));

            for primitive in &mesh.primitives {
                let color = match tint {
                    Some([r, g, b]) => [r, g, b, 1.0],
                    None => primitive.base_color,
                };
                self.lit.set_vec4(gl, "u_color", color);
                primitive.render_data.draw(gl, glow::TRIANGLES);
            }
        }
    }

    fn draw_lines(&self, scene: &SceneGraph, view_projection: &Matrix4<f32>) {
        let gl = &self.gl;
        self.lines.bind(gl);

        for node in scene.nodes().iter().filter(|n| n.visible) {
            let (data, size) = match &node.kind {
                NodeKind::Axes { size } => (&self.axes, *size),
                NodeKind::Grid { size, divisions } => match self.grids.get(divisions) {
                    Some(data) => (data, *size),
                    None => continue,
                },
                _ => continue,
            };

            let model = node.transform.model_matrix() * Matrix4::from_scale(size);
            self.lines.set_mat4(gl, "u_mvp", &(*view_projection * model));
            data.draw(gl, glow::LINES);
        }
    }
}

impl Renderer for GlowRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) {
        if self.viewport.is_empty() {
            return;
        }

        self.sync_grids(scene);

        let viewport = self.viewport;
        let [r, g, b] = scene.background;
        unsafe {
            let gl = &self.gl;
            gl.viewport(viewport.x, viewport.y, viewport.width, viewport.height);
            gl.enable(glow::SCISSOR_TEST);
            gl.scissor(viewport.x, viewport.y, viewport.width, viewport.height);
            gl.clear_color(r, g, b, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LESS);
            gl.enable(glow::CULL_FACE);
        }

        let view_projection = camera.view_projection();
        self.draw_lit(scene, &view_projection);

        unsafe {
            self.gl.disable(glow::CULL_FACE);
        }
        self.draw_lines(scene, &view_projection);

        unsafe {
            let gl = &self.gl;
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::SCISSOR_TEST);
        }
    }
}

impl Drop for GlowRenderer {
    fn drop(&mut self) {
        let gl = &self.gl;
        self.lit.delete(gl);
        self.lines.delete(gl);
        self.cube.delete(gl);
        self.ground.delete(gl);
        self.axes.delete(gl);
        for grid in self.grids.values() {
            grid.delete(gl);
        }
        for model in &self.models {
            model.delete(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::transform::Transform, scene::Light};

    #[test]
    fn default_lighting_has_ambient_and_sun() {
        let scene = SceneGraph::with_default_lighting("Test");
        let rig = LightRig::from_scene(&scene);

        assert!((rig.ambient[0] - 0.4).abs() < 1e-6);
        assert!((rig.sun_color[1] - 0.8).abs() < 1e-6);
        assert!((rig.sun_direction.magnitude() - 1.0).abs() < 1e-5);
        assert!(rig.sun_direction.y > 0.0);
        assert_eq!(rig.point_color, [0.0; 3]);
    }

    #[test]
    fn ambient_lights_accumulate() {
        let mut scene = SceneGraph::with_default_lighting("Test");
        scene.add(
            "Fill",
            NodeKind::Light(Light {
                kind: LightKind::Ambient,
                color: [1.0, 0.0, 0.0],
                intensity: 0.5,
            }),
            Transform::default(),
        );
        let rig = LightRig::from_scene(&scene);
        assert!((rig.ambient[0] - 0.9).abs() < 1e-6);
        assert!((rig.ambient[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn model_nodes_need_an_uploaded_mesh() {
        assert_eq!(mesh_slot(&NodeKind::Model, None), None);
        assert_eq!(
            mesh_slot(&NodeKind::Model, Some(MeshHandle(0))),
            Some(MeshSlot::Model(MeshHandle(0)))
        );
        assert_eq!(
            mesh_slot(
                &NodeKind::Cube {
                    size: 1.0,
                    color: [1.0; 3]
                },
                None
            ),
            Some(MeshSlot::Cube)
        );
        assert_eq!(mesh_slot(&NodeKind::Axes { size: 2.0 }, None), None);
    }

    #[test]
    fn pruned_grids_are_no_longer_wanted() {
        let mut scene = SceneGraph::with_default_lighting("Test");
        assert!(grid_divisions(&scene).is_empty());

        let grid = NodeKind::Grid {
            size: 10.0,
            divisions: 20,
        };
        scene.add("Grid", grid.clone(), Transform::default());
        scene.add("Grid", grid, Transform::default());
        assert_eq!(grid_divisions(&scene), HashSet::from([20]));

        scene.prune_to_baseline();
        assert!(grid_divisions(&scene).is_empty());
    }
}
