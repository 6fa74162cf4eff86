use std::path::{Path, PathBuf};

use cgmath::{InnerSpace, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};
use crossbeam_channel::{unbounded, Receiver, Sender};
use gltf::Gltf;

use crate::{
    animation::{AnimationClip, ClipLibrary},
    data::{LoadedModel, LoadedPrimitive, VertexData},
};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open glTF {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("failed to read buffers of {path}: {source}")]
    BufferRead {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("GLB binary chunk missing in {0}")]
    MissingBlob(PathBuf),

    #[error("mesh '{mesh}' in {path} is missing positions")]
    MissingPositions { path: PathBuf, mesh: String },

    #[error("mesh '{mesh}' in {path} is malformed: {reason}")]
    MalformedPrimitive {
        path: PathBuf,
        mesh: String,
        reason: String,
    },

    #[error("loader thread is gone")]
    Disconnected,
}

pub fn load_gltf_full(path: &Path) -> Result<LoadedModel, LoadError> {
    let gltf = Gltf::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let raw_buffers = read_buffers(&gltf, path)?;

    let mut primitives = Vec::new();
    match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Matrix4::identity(), &raw_buffers, path, &mut primitives)?;
            }
        }
        None => {
            for mesh in gltf.meshes() {
                collect_mesh(&mesh, Matrix4::identity(), &raw_buffers, path, &mut primitives)?;
            }
        }
    }

    let clips = gltf
        .animations()
        .map(|animation| read_clip(&animation, &raw_buffers))
        .collect();

    Ok(LoadedModel {
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Model".to_string()),
        path: path.to_path_buf(),
        primitives,
        clips: ClipLibrary::new(clips),
    })
}

fn read_buffers(gltf: &Gltf, path: &Path) -> Result<Vec<Vec<u8>>, LoadError> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    // Files next to the asset, `data:` URIs and the GLB chunk
    let buffers = gltf::import_buffers(&gltf.document, Some(base), gltf.blob.clone()).map_err(
        |source| match source {
            gltf::Error::MissingBlob => LoadError::MissingBlob(path.to_path_buf()),
            source => LoadError::BufferRead {
                path: path.to_path_buf(),
                source,
            },
        },
    )?;

    Ok(buffers.into_iter().map(|data| data.0).collect())
}

fn collect_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    raw_buffers: &[Vec<u8>],
    path: &Path,
    out: &mut Vec<LoadedPrimitive>,
) -> Result<(), LoadError> {
    let world = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, raw_buffers, path, out)?;
    }

    for child in node.children() {
        collect_node(&child, world, raw_buffers, path, out)?;
    }

    Ok(())
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    world: Matrix4<f32>,
    raw_buffers: &[Vec<u8>],
    path: &Path,
    out: &mut Vec<LoadedPrimitive>,
) -> Result<(), LoadError> {
    let normal_matrix = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| raw_buffers.get(buffer.index()).map(|v| v.as_slice()));

        let positions: Vec<[f32; 3]> = match reader.read_positions() {
            Some(iter) => iter
                .map(|p| {
                    let v = world * Vector4::new(p[0], p[1], p[2], 1.0);
                    [v.x, v.y, v.z]
                })
                .collect(),
            None => {
                return Err(LoadError::MissingPositions {
                    path: path.to_path_buf(),
                    mesh: mesh.name().unwrap_or("unnamed").to_string(),
                })
            }
        };

        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| {
            iter.map(|n| {
                let v = normal_matrix * Vector3::new(n[0], n[1], n[2]);
                let v = if v.magnitude2() > f32::EPSILON {
                    v.normalize()
                } else {
                    v
                };
                [v.x, v.y, v.z]
            })
            .collect()
        });

        let indices: Option<Vec<u32>> = reader.read_indices().map(|idx| idx.into_u32().collect());

        let malformed = |reason: String| LoadError::MalformedPrimitive {
            path: path.to_path_buf(),
            mesh: mesh.name().unwrap_or("unnamed").to_string(),
            reason,
        };
        if let Some(normals) = &normals {
            if normals.len() != positions.len() {
                return Err(malformed(format!(
                    "{} normals for {} positions",
                    normals.len(),
                    positions.len()
                )));
            }
        }
        if let Some(max) = indices.as_ref().and_then(|idx| idx.iter().max()) {
            if *max as usize >= positions.len() {
                return Err(malformed(format!(
                    "index {} past {} vertices",
                    max,
                    positions.len()
                )));
            }
        }

        out.push(LoadedPrimitive {
            vertex_data: VertexData { positions, normals },
            indices,
            base_color: primitive
                .material()
                .pbr_metallic_roughness()
                .base_color_factor(),
        });
    }

    Ok(())
}

fn read_clip(animation: &gltf::Animation, raw_buffers: &[Vec<u8>]) -> AnimationClip {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("animation_{}", animation.index()));

    let mut duration = 0.0f32;
    let mut channel_count = 0;

    for channel in animation.channels() {
        channel_count += 1;
        let reader = channel.reader(|buffer| raw_buffers.get(buffer.index()).map(|v| v.as_slice()));
        if let Some(inputs) = reader.read_inputs() {
            duration = inputs.fold(duration, f32::max);
        }
    }

    AnimationClip::new(name, duration, channel_count)
}

pub enum AssetRequest {
    LoadModel(PathBuf),
}

pub type LoadResult = (PathBuf, Result<LoadedModel, LoadError>);

pub struct AssetLoader {
    request_tx: Sender<AssetRequest>,
    result_rx: Receiver<LoadResult>,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (request_tx, request_rx) = unbounded::<AssetRequest>();
        let (result_tx, result_rx) = unbounded::<LoadResult>();

        std::thread::spawn(move || {
            for request in request_rx {
                match request {
                    AssetRequest::LoadModel(path) => {
                        log::info!("Loader thread: loading model {:?}", path);

                        let result = load_gltf_full(&path);
                        if let Ok(model) = &result {
                            log::info!(
                                "Loaded {} ({} primitives, {} vertices, clips: {:?})",
                                model.name,
                                model.primitives.len(),
                                model.vertex_count(),
                                model.clips.names()
                            );
                        }

                        if result_tx.send((path, result)).is_err() {
                            log::warn!("Loader thread: receiver dropped, stopping");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            request_tx,
            result_rx,
        }
    }

    /// Request an async load of a model.
    pub fn request_model<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        self.request_tx
            .send(AssetRequest::LoadModel(path.as_ref().to_path_buf()))
            .map_err(|_| LoadError::Disconnected)
    }

    /// Poll to see if any models have been loaded.
    pub fn poll_loaded(&self) -> Vec<LoadResult> {
        let mut loaded = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            loaded.push(result);
        }
        loaded
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn write_triangle_gltf(dir: &Path) -> PathBuf {
        let mut bin = Vec::new();
        let floats: [f32; 17] = [
            // positions
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
            // keyframe times
            0.0, 1.0,
            // translations
            0.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        for f in floats {
            bin.extend_from_slice(&f.to_le_bytes());
        }
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();

        let json = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "name": "Tri", "mesh": 0 }],
  "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
  "animations": [{
    "name": "wave",
    "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
    "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }]
  }],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
      "min": [0.0], "max": [1.0] },
    { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
  ],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
    { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
  ],
  "buffers": [{ "byteLength": 68, "uri": "tri.bin" }]
}"#;
        let path = dir.join("tri.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_mesh_and_clips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let model = load_gltf_full(&path).unwrap();
        assert_eq!(model.name, "tri");
        assert_eq!(model.primitives.len(), 1);
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.primitives[0].vertex_data.positions[1], [1.0, 0.0, 0.0]);

        let clip = model.clips.find_by_name("wave").unwrap();
        assert_eq!(clip.channel_count, 1);
        assert!((clip.duration - 1.0).abs() < 1e-6);
    }

    const EMBEDDED_BUFFER: &str =
        "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAIA/";

    // Three positions followed by one normal, all inside a data URI.
    fn write_embedded_gltf(dir: &Path, attributes: &str) -> PathBuf {
        let json = format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "name": "Tri", "mesh": 0 }}],
  "meshes": [{{ "name": "Tri", "primitives": [{{ "attributes": {attributes} }}] }}],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 1, "type": "VEC3" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 12 }}
  ],
  "buffers": [{{ "byteLength": 48, "uri": "{EMBEDDED_BUFFER}" }}]
}}"#
        );
        let path = dir.join("embedded.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_embedded_data_uri_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_embedded_gltf(dir.path(), r#"{ "POSITION": 0 }"#);

        let model = load_gltf_full(&path).unwrap();
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.primitives[0].vertex_data.positions[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn short_normal_accessor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_embedded_gltf(dir.path(), r#"{ "POSITION": 0, "NORMAL": 1 }"#);

        match load_gltf_full(&path) {
            Err(LoadError::MalformedPrimitive { mesh, reason, .. }) => {
                assert_eq!(mesh, "Tri");
                assert_eq!(reason, "1 normals for 3 positions");
            }
            other => panic!("expected a malformed primitive, got {:?}", other.map(|m| m.name)),
        }
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_gltf_full(&dir.path().join("nope.glb"));
        assert!(matches!(result, Err(LoadError::Open { .. })));
    }

    #[test]
    fn missing_buffer_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());
        std::fs::remove_file(dir.path().join("tri.bin")).unwrap();

        assert!(matches!(
            load_gltf_full(&path),
            Err(LoadError::BufferRead { .. })
        ));
    }

    #[test]
    fn background_loader_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.glb");

        let loader = AssetLoader::new();
        loader.request_model(&missing).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.is_empty() && Instant::now() < deadline {
            results = loader.poll_loaded();
            std::thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, missing);
        assert!(results[0].1.is_err());
    }
}
