//! Optional per-model metadata resource.
//!
//! ```json
//! {
//!   "title": "Villa Aurora",
//!   "ground_meshes": ["Terrain"],
//!   "camera": { "position": [12, 1.7, 12], "target": [0, 1.2, 0] }
//! }
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraStart {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraStart {
    fn default() -> Self {
        Self {
            position: Vec3::new(10.0, 1.7, 10.0),
            target: Vec3::new(0.0, 1.2, 0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMetadata {
    pub title: Option<String>,
    /// Meshes that receive but never cast shadows.
    pub ground_meshes: Vec<String>,
    pub camera: CameraStart,
}

impl ModelMetadata {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
