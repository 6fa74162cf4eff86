use std::collections::HashSet;

use crate::{components::transform::Transform, handles::NodeId};

pub type Rgb = [f32; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Model,
    Light(Light),
    Ground { size: f32, color: Rgb },
    Cube { size: f32, color: Rgb },
    Axes { size: f32 },
    Grid { size: f32, divisions: u32 },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Model => "Model",
            NodeKind::Light(_) => "Light",
            NodeKind::Ground { .. } => "Ground",
            NodeKind::Cube { .. } => "Cube",
            NodeKind::Axes { .. } => "Axes",
            NodeKind::Grid { .. } => "Grid",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
}

/// Flat scene graph: the model root, startup lights and whatever scripts add.
///
/// Nodes marked permanent survive [`SceneGraph::prune_to_baseline`]; everything
/// else is considered an addition made by exercise code.
#[derive(Debug)]
pub struct SceneGraph {
    pub name: String,
    pub background: Rgb,
    nodes: Vec<SceneNode>,
    permanent: HashSet<NodeId>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new<T: ToString>(name: T) -> Self {
        Self {
            name: name.to_string(),
            background: [1.0, 1.0, 1.0],
            nodes: Vec::new(),
            permanent: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn with_default_lighting<T: ToString>(name: T) -> Self {
        let mut scene = Self::new(name);

        let ambient = scene.add(
            "Ambient Light",
            NodeKind::Light(Light {
                kind: LightKind::Ambient,
                color: [1.0, 1.0, 1.0],
                intensity: 0.4,
            }),
            Transform::default(),
        );
        let sun = scene.add(
            "Sun",
            NodeKind::Light(Light {
                kind: LightKind::Directional,
                color: [1.0, 1.0, 1.0],
                intensity: 0.8,
            }),
            Transform::from_translation(cgmath::vec3(5.0, 10.0, 7.5)),
        );

        scene.mark_permanent(ambient);
        scene.mark_permanent(sun);
        scene
    }

    pub fn add<T: ToString>(&mut self, name: T, kind: NodeKind, transform: Transform) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        self.nodes.push(SceneNode {
            id,
            name: name.to_string(),
            kind,
            transform,
            visible: true,
        });

        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        self.permanent.remove(&id);
        Some(self.nodes.remove(index))
    }

    pub fn mark_permanent(&mut self, id: NodeId) {
        if self.contains(id) {
            self.permanent.insert(id);
        }
    }

    pub fn is_permanent(&self, id: NodeId) -> bool {
        self.permanent.contains(&id)
    }

    pub fn prune_to_baseline(&mut self) -> usize {
        let before = self.nodes.len();
        let permanent = &self.permanent;
        self.nodes.retain(|n| permanent.contains(&n.id));
        before - self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn membership(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
