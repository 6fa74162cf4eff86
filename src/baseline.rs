use std::fmt;
use std::path::PathBuf;

use cgmath::{point3, vec3, Point3, Vector3};

use crate::components::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingName {
    Scene,
    Lib,
    Model,
    Mixer,
    Camera,
}

impl BindingName {
    pub const ALL: [BindingName; 5] = [
        BindingName::Scene,
        BindingName::Lib,
        BindingName::Model,
        BindingName::Mixer,
        BindingName::Camera,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BindingName::Scene => "scene",
            BindingName::Lib => "lib",
            BindingName::Model => "model",
            BindingName::Mixer => "mixer",
            BindingName::Camera => "camera",
        }
    }

    pub fn parse(word: &str) -> Option<BindingName> {
        Self::ALL.into_iter().find(|b| b.as_str() == word)
    }
}

impl fmt::Display for BindingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Point3<f32>,
    /// Aim at the model root when loaded, otherwise at the origin.
    pub look_at_model: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetBaseline {
    pub name: &'static str,
    pub asset_path: PathBuf,
    pub scale: f32,
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub camera: CameraPose,
    pub bindings: Vec<BindingName>,
}

impl AssetBaseline {
    pub const PRESETS: [&'static str; 4] = ["soldier", "robot", "fox", "horse"];

    pub fn soldier() -> Self {
        Self {
            name: "soldier",
            asset_path: PathBuf::from("assets/Soldier.glb"),
            scale: 0.5,
            position: vec3(0.0, 0.0, 0.0),
            rotation: vec3(0.0, 0.0, 0.0),
            camera: CameraPose {
                position: point3(0.0, 5.0, 15.0),
                look_at_model: true,
            },
            bindings: BindingName::ALL.to_vec(),
        }
    }

    pub fn robot() -> Self {
        Self {
            name: "robot",
            asset_path: PathBuf::from("assets/RobotExpressive.glb"),
            scale: 1.0,
            position: vec3(0.0, -1.0, 0.0),
            rotation: vec3(0.0, 0.0, 0.0),
            camera: CameraPose {
                position: point3(0.0, 3.0, 10.0),
                look_at_model: true,
            },
            bindings: BindingName::ALL.to_vec(),
        }
    }

    /// The fox is authored in centimetres, hence the tiny scale.
    pub fn fox() -> Self {
        Self {
            name: "fox",
            asset_path: PathBuf::from("assets/Fox.glb"),
            scale: 0.02,
            position: vec3(0.0, 0.0, 0.0),
            rotation: vec3(0.0, 0.0, 0.0),
            camera: CameraPose {
                position: point3(0.0, 3.0, 8.0),
                look_at_model: true,
            },
            bindings: BindingName::ALL.to_vec(),
        }
    }

    pub fn horse() -> Self {
        Self {
            name: "horse",
            asset_path: PathBuf::from("assets/Horse.glb"),
            scale: 0.015,
            position: vec3(0.0, -1.0, 0.0),
            rotation: vec3(0.0, 0.0, 0.0),
            camera: CameraPose {
                position: point3(0.0, 4.0, 12.0),
                look_at_model: true,
            },
            // The horse demo never exposed the camera to scripts.
            bindings: vec![
                BindingName::Scene,
                BindingName::Lib,
                BindingName::Model,
                BindingName::Mixer,
            ],
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "soldier" => Some(Self::soldier()),
            "robot" => Some(Self::robot()),
            "fox" => Some(Self::fox()),
            "horse" => Some(Self::horse()),
            _ => None,
        }
    }

    pub fn with_asset_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.asset_path = path.into();
        self
    }

    pub fn model_transform(&self) -> Transform {
        Transform::new(self.position, self.rotation, vec3(self.scale, self.scale, self.scale))
    }

    pub fn allows(&self, binding: BindingName) -> bool {
        self.bindings.contains(&binding)
    }
}

impl Default for AssetBaseline {
    fn default() -> Self {
        Self::soldier()
    }
}
