use cgmath::Vector3;

use crate::{handles::NodeId, scene::SceneGraph};

/// Per-frame movement a script scheduled. Motions outlive the script run
/// that created them and are only dropped when they finish, when their
/// node disappears or when an exercise is selected.
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Translate {
        node: NodeId,
        step: Vector3<f32>,
        remaining_frames: u32,
    },
    Pulse {
        node: NodeId,
        base: Vector3<f32>,
        amplitude: f32,
        period: f32,
        elapsed: f32,
    },
}

impl Motion {
    pub fn node(&self) -> NodeId {
        match self {
            Motion::Translate { node, .. } | Motion::Pulse { node, .. } => *node,
        }
    }

    pub fn advance(&mut self, scene: &mut SceneGraph, dt: f32) -> bool {
        let Some(target) = scene.get_mut(self.node()) else {
            return false;
        };

        match self {
            Motion::Translate {
                step,
                remaining_frames,
                ..
            } => {
                if *remaining_frames == 0 {
                    return false;
                }
                target.transform.translation += *step;
                *remaining_frames -= 1;
                *remaining_frames > 0
            }
            Motion::Pulse {
                base,
                amplitude,
                period,
                elapsed,
                ..
            } => {
                *elapsed += dt;
                let phase = if *period > 0.0 {
                    *elapsed / *period * std::f32::consts::TAU
                } else {
                    0.0
                };
                target.transform.scale = *base * (1.0 + *amplitude * phase.sin());
                true
            }
        }
    }
}

pub fn advance_all(motions: &mut Vec<Motion>, scene: &mut SceneGraph, dt: f32) {
    motions.retain_mut(|motion| motion.advance(scene, dt));
}

pub fn take_pulse(motions: &mut Vec<Motion>, node: NodeId) -> Option<Vector3<f32>> {
    let rest = motions.iter().find_map(|motion| match motion {
        Motion::Pulse { node: n, base, .. } if *n == node => Some(*base),
        _ => None,
    });
    motions.retain(|motion| !matches!(motion, Motion::Pulse { node: n, .. } if *n == node));
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{components::transform::Transform, scene::NodeKind};
    use cgmath::vec3;

    #[test]
    fn translate_runs_for_the_requested_frames() {
        let mut scene = SceneGraph::new("Test");
        let node = scene.add("Model", NodeKind::Model, Transform::default());
        let mut motions = vec![Motion::Translate {
            node,
            step: vec3(0.0, 0.0, 0.05),
            remaining_frames: 3,
        }];

        for _ in 0..5 {
            advance_all(&mut motions, &mut scene, 0.016);
        }

        assert!(motions.is_empty());
        let z = scene.get(node).unwrap().transform.translation.z;
        assert!((z - 0.15).abs() < 1e-5);
    }

    #[test]
    fn pulse_stays_scheduled_and_changes_scale() {
        let mut scene = SceneGraph::new("Test");
        let node = scene.add("Model", NodeKind::Model, Transform::default());
        let mut motions = vec![Motion::Pulse {
            node,
            base: vec3(1.0, 1.0, 1.0),
            amplitude: 0.5,
            period: 1.0,
            elapsed: 0.0,
        }];

        advance_all(&mut motions, &mut scene, 0.25);

        assert_eq!(motions.len(), 1);
        let scale = scene.get(node).unwrap().transform.scale;
        assert!((scale.x - 1.5).abs() < 1e-4);
    }

    #[test]
    fn take_pulse_keeps_other_motions() {
        let mut scene = SceneGraph::new("Test");
        let node = scene.add("Model", NodeKind::Model, Transform::default());
        let other = scene.add("Cube", NodeKind::Axes { size: 1.0 }, Transform::default());
        let pulse = |node, base| Motion::Pulse {
            node,
            base,
            amplitude: 0.1,
            period: 1.0,
            elapsed: 0.0,
        };
        let mut motions = vec![
            pulse(node, vec3(0.5, 0.5, 0.5)),
            Motion::Translate {
                node,
                step: vec3(1.0, 0.0, 0.0),
                remaining_frames: 10,
            },
            pulse(other, vec3(2.0, 2.0, 2.0)),
        ];

        assert_eq!(take_pulse(&mut motions, node), Some(vec3(0.5, 0.5, 0.5)));
        assert_eq!(motions.len(), 2);
        assert_eq!(take_pulse(&mut motions, node), None);
        assert_eq!(motions[1].node(), other);
    }

    #[test]
    fn motion_on_removed_node_is_dropped() {
        let mut scene = SceneGraph::new("Test");
        let node = scene.add("Cube", NodeKind::Axes { size: 1.0 }, Transform::default());
        scene.remove(node);

        let mut motions = vec![Motion::Translate {
            node,
            step: vec3(1.0, 0.0, 0.0),
            remaining_frames: 10,
        }];
        advance_all(&mut motions, &mut scene, 0.016);
        assert!(motions.is_empty());
    }
}
