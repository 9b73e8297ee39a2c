//! Shared fixtures: hand-built glTF payloads, a populated in-memory transport
//! and a recording progress sink.

#![allow(dead_code)]

use serde_json::{Value, json};

use valevision::assets::descriptor::LoadManifest;
use valevision::assets::io::MemoryTransport;
use valevision::errors::{ErrorClass, VisionError};
use valevision::pipeline::progress::{LoadProgress, ProgressSink};

// ============================================================================
// glTF builder
// ============================================================================

pub struct MaterialSpec {
    pub name: &'static str,
    pub base_color: [f32; 4],
    pub diffuse_image: Option<usize>,
    pub normal_image: Option<usize>,
}

impl MaterialSpec {
    pub fn plain(name: &'static str, base_color: [f32; 4]) -> Self {
        Self {
            name,
            base_color,
            diffuse_image: None,
            normal_image: None,
        }
    }
}

/// 36 zero bytes: one triangle of `VEC3` positions.
const POSITION_BUFFER: &str = "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Builds a minimal valid glTF document.
///
/// `meshes` are `(name, material index)`; each image gets one texture with the
/// same index.
pub fn gltf_model(
    meshes: &[(&str, Option<usize>)],
    materials: &[MaterialSpec],
    images: &[&str],
) -> Vec<u8> {
    let materials: Vec<Value> = materials
        .iter()
        .map(|m| {
            let mut pbr = json!({ "baseColorFactor": m.base_color });
            if let Some(image) = m.diffuse_image {
                pbr["baseColorTexture"] = json!({ "index": image });
            }
            let mut material = json!({ "name": m.name, "pbrMetallicRoughness": pbr });
            if let Some(image) = m.normal_image {
                material["normalTexture"] = json!({ "index": image });
            }
            material
        })
        .collect();

    let meshes: Vec<Value> = meshes
        .iter()
        .map(|(name, material)| {
            let mut primitive = json!({ "attributes": { "POSITION": 0 } });
            if let Some(material) = material {
                primitive["material"] = json!(material);
            }
            json!({ "name": name, "primitives": [primitive] })
        })
        .collect();

    let mut doc = json!({
        "asset": { "version": "2.0" },
        "buffers": [{ "byteLength": 36, "uri": POSITION_BUFFER }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }],
        "meshes": meshes,
    });
    if !materials.is_empty() {
        doc["materials"] = Value::Array(materials);
    }
    if !images.is_empty() {
        doc["images"] = images.iter().map(|uri| json!({ "uri": uri })).collect();
        doc["textures"] = (0..images.len()).map(|i| json!({ "source": i })).collect();
    }
    serde_json::to_vec(&doc).unwrap()
}

/// A single untextured mesh.
pub fn simple_model(mesh: &str) -> Vec<u8> {
    gltf_model(
        &[(mesh, Some(0))],
        &[MaterialSpec::plain("Default", [0.7, 0.7, 0.7, 1.0])],
        &[],
    )
}

/// The "Villa" building shell: a textured near-black wall and a ground plane.
pub fn villa_shell() -> Vec<u8> {
    gltf_model(
        &[("Wall", Some(0)), ("Ground", Some(1))],
        &[
            MaterialSpec {
                name: "Plaster",
                base_color: [0.0, 0.0, 0.0, 1.0],
                diffuse_image: Some(0),
                normal_image: Some(1),
            },
            MaterialSpec::plain("Lawn", [0.2, 0.5, 0.1, 1.0]),
        ],
        &["Villa_diffuse.png", "Villa_normal.png"],
    )
}

/// In-memory server with the villa shell, its furniture overlay and one
/// diffuse texture. The normal map is referenced but never served.
pub fn villa_transport() -> MemoryTransport {
    let transport = MemoryTransport::new().with_chunk_size(64);
    transport.insert("Villa.glb", villa_shell());
    transport.insert("Villa_Furniture.glb", simple_model("Sofa"));
    transport.insert("Villa_diffuse.png", vec![0x89; 300]);
    transport
}

// ============================================================================
// Progress recording
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Vec<LoadProgress>,
    pub finished: Vec<Result<LoadManifest, ErrorClass>>,
}

impl RecordingSink {
    pub fn percents(&self) -> Vec<f32> {
        self.reports.iter().map(|p| p.percent).collect()
    }

    pub fn last_percent(&self) -> f32 {
        self.reports.last().map_or(0.0, |p| p.percent)
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&mut self, progress: &LoadProgress) {
        self.reports.push(progress.clone());
    }

    fn on_finished(&mut self, outcome: Result<&LoadManifest, &VisionError>) {
        self.finished
            .push(outcome.map(Clone::clone).map_err(VisionError::class));
    }
}
