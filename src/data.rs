use std::path::PathBuf;

use crate::animation::ClipLibrary;

#[derive(Debug, Clone, Default)]
pub struct VertexData {
    pub positions: Vec<[f32; 3]>, // Required, already in model space
    pub normals: Option<Vec<[f32; 3]>>,
}

impl VertexData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Interleaves position and normal, substituting +Y where normals are missing.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.positions.len() * 6);
        let normals = self.normals.as_deref().unwrap_or_default();

        for (i, position) in self.positions.iter().enumerate() {
            interleaved.extend_from_slice(position);
            interleaved.extend_from_slice(normals.get(i).unwrap_or(&[0.0, 1.0, 0.0]));
        }

        interleaved
    }
}

#[derive(Debug, Clone)]
pub struct LoadedPrimitive {
    pub vertex_data: VertexData,
    pub indices: Option<Vec<u32>>,
    pub base_color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
    pub path: PathBuf,
    pub primitives: Vec<LoadedPrimitive>,
    pub clips: ClipLibrary,
}

impl LoadedModel {
    pub fn vertex_count(&self) -> usize {
        self.primitives
            .iter()
            .map(|p| p.vertex_data.vertex_count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_fills_missing_normals() {
        let data = VertexData {
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            normals: None,
        };
        assert_eq!(
            data.interleaved(),
            vec![1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 4.0, 5.0, 6.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn interleave_tolerates_short_normals() {
        let data = VertexData {
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            normals: Some(vec![[0.0, 0.0, 1.0]]),
        };
        assert_eq!(
            data.interleaved(),
            vec![1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 4.0, 5.0, 6.0, 0.0, 1.0, 0.0]
        );
    }
}
