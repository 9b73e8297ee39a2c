//! Viewer Configuration
//!
//! The viewer is driven by a declarative JSON document that enumerates, per
//! logical model, its base resource identifier, optional explicit overlay and
//! texture lists, lighting parameters, effect flags and quality tier.
//!
//! # Example
//!
//! ```json
//! {
//!   "transport_root": "https://cdn.example.com/models/",
//!   "quality": "medium",
//!   "models": [
//!     {
//!       "id": "house-a",
//!       "base": "House_A",
//!       "textures": ["wall_diffuse.png"],
//!       "lighting": { "hdri": { "url": "studio.env", "brightness": 1.5, "rotation_degrees": 90 } },
//!       "effects": { "hdri": true, "ssao": true, "shadows": true }
//!     }
//!   ]
//! }
//! ```
//!
//! Omitted fields take their `Default` values. [`ViewerConfig::validate`] is run
//! by both constructors, so a parsed config always satisfies the documented
//! ranges.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::effects::QualityTier;
use crate::errors::{Result, VisionError};

/// Valid HDRI brightness range (inclusive).
pub const HDRI_BRIGHTNESS_RANGE: (f32, f32) = (0.1, 20.0);
/// Valid HDRI rotation range in degrees (inclusive).
pub const HDRI_ROTATION_RANGE: (f32, f32) = (0.0, 360.0);

// ============================================================================
// Top-level document
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base directory or URL every model resource is resolved against.
    pub transport_root: String,
    /// Quality tier used when a model does not override it.
    pub quality: QualityTier,
    /// Naming conventions for probing optional resources.
    pub conventions: DiscoveryConventions,
    /// Pipeline tunables.
    pub pipeline: PipelineSettings,
    pub models: Vec<ModelConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            transport_root: ".".to_string(),
            quality: QualityTier::Medium,
            conventions: DiscoveryConventions::default(),
            pipeline: PipelineSettings::default(),
            models: Vec::new(),
        }
    }
}

impl ViewerConfig {
    /// Parses and validates a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Looks up a model by id.
    pub fn model(&self, id: &str) -> Result<&ModelConfig> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| VisionError::Config(format!("unknown model id '{id}'")))
    }

    /// Effective quality tier for a model.
    #[must_use]
    pub fn quality_for(&self, model: &ModelConfig) -> QualityTier {
        model.quality.unwrap_or(self.quality)
    }

    pub fn validate(&self) -> Result<()> {
        if self.transport_root.trim().is_empty() {
            return Err(VisionError::Config("transport_root is empty".into()));
        }
        self.pipeline.validate()?;

        let mut seen = rustc_hash::FxHashSet::default();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(VisionError::Config("model id is empty".into()));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(VisionError::Config(format!(
                    "duplicate model id '{}'",
                    model.id
                )));
            }
            model.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Per-model configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub id: String,
    /// Base resource name; defaults to `id` when empty.
    pub base: String,
    /// Explicit overlay mesh list. `None` probes the naming conventions.
    pub overlays: Option<Vec<String>>,
    /// Explicit external texture list. `None` probes the naming conventions.
    pub textures: Option<Vec<String>>,
    pub lighting: LightingConfig,
    pub effects: EffectFlags,
    pub quality: Option<QualityTier>,
    /// Mesh names excluded from shadow casting (ground planes, backdrops).
    pub ground_meshes: Vec<String>,
}

impl ModelConfig {
    /// Convenience constructor for a model whose base equals its id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            base: id.clone(),
            id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        if self.base.is_empty() { &self.id } else { &self.base }
    }

    fn validate(&self) -> Result<()> {
        self.lighting.validate()?;
        for list in [&self.overlays, &self.textures].into_iter().flatten() {
            if list.iter().any(|s| s.trim().is_empty()) {
                return Err(VisionError::Config(format!(
                    "model '{}' lists an empty resource name",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectFlags {
    pub hdri: bool,
    pub ssao: bool,
    pub shadows: bool,
}

// ============================================================================
// Lighting
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub hdri: Option<HdriConfig>,
    pub directional_intensity: f32,
    pub ambient_intensity: f32,
    /// Multiplier applied to the standard lights while HDRI is active (0 disables them).
    pub light_dim_factor: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            hdri: None,
            directional_intensity: 1.0,
            ambient_intensity: 0.6,
            light_dim_factor: 0.2,
        }
    }
}

impl LightingConfig {
    fn validate(&self) -> Result<()> {
        if let Some(hdri) = &self.hdri {
            hdri.validate()?;
        }
        if !(0.0..=1.0).contains(&self.light_dim_factor) {
            return Err(VisionError::Config(format!(
                "light_dim_factor {} outside 0.0-1.0",
                self.light_dim_factor
            )));
        }
        if self.directional_intensity < 0.0 || self.ambient_intensity < 0.0 {
            return Err(VisionError::Config("light intensities must be >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdriConfig {
    /// Environment texture, relative to the transport root or absolute.
    pub url: String,
    pub brightness: f32,
    pub rotation_degrees: f32,
}

impl Default for HdriConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            brightness: 1.0,
            rotation_degrees: 0.0,
        }
    }
}

impl HdriConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(VisionError::Config("hdri url is empty".into()));
        }
        let (lo, hi) = HDRI_BRIGHTNESS_RANGE;
        if !(lo..=hi).contains(&self.brightness) {
            return Err(VisionError::Config(format!(
                "hdri brightness {} outside {lo}-{hi}",
                self.brightness
            )));
        }
        let (lo, hi) = HDRI_ROTATION_RANGE;
        if !(lo..=hi).contains(&self.rotation_degrees) {
            return Err(VisionError::Config(format!(
                "hdri rotation {} outside {lo}-{hi} degrees",
                self.rotation_degrees
            )));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn rotation_radians(&self) -> f32 {
        self.rotation_degrees.to_radians()
    }
}

// ============================================================================
// Discovery conventions
// ============================================================================

/// File naming conventions probed when a model has no explicit resource lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConventions {
    pub mesh_extension: String,
    pub metadata_extension: String,
    pub overlay_suffixes: Vec<String>,
    pub texture_suffixes: Vec<String>,
    pub probe_metadata: bool,
}

impl Default for DiscoveryConventions {
    fn default() -> Self {
        Self {
            mesh_extension: "glb".to_string(),
            metadata_extension: "json".to_string(),
            overlay_suffixes: vec![
                "_Furniture".to_string(),
                "_Landscape".to_string(),
                "_Glazing".to_string(),
            ],
            texture_suffixes: vec![
                "_diffuse.png".to_string(),
                "_normal.png".to_string(),
                "_roughness.png".to_string(),
            ],
            probe_metadata: true,
        }
    }
}

impl DiscoveryConventions {
    #[must_use]
    pub fn primary_name(&self, base: &str) -> String {
        format!("{base}.{}", self.mesh_extension)
    }

    #[must_use]
    pub fn metadata_name(&self, base: &str) -> String {
        format!("{base}.{}", self.metadata_extension)
    }

    pub fn overlay_candidates<'a>(&'a self, base: &'a str) -> impl Iterator<Item = String> + 'a {
        self.overlay_suffixes
            .iter()
            .map(move |suffix| format!("{base}{suffix}.{}", self.mesh_extension))
    }

    pub fn texture_candidates<'a>(&'a self, base: &'a str) -> impl Iterator<Item = String> + 'a {
        self.texture_suffixes
            .iter()
            .map(move |suffix| format!("{base}{suffix}"))
    }
}

// ============================================================================
// Pipeline tunables
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Read size for chunked transports, in bytes.
    pub chunk_size: usize,
    /// Number of optional overlay meshes allowed to fail import.
    pub overlay_failure_budget: usize,
    /// Base colours whose brightest channel is below this value count as near-black.
    pub near_black_threshold: f32,
    /// Relative weight of each stage in the overall percentage:
    /// discovery, fetch, assembly, effects.
    pub stage_weights: [f32; 4],
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            overlay_failure_budget: 3,
            near_black_threshold: 0.04,
            stage_weights: [5.0, 80.0, 10.0, 5.0],
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(VisionError::Config("chunk_size must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.near_black_threshold) {
            return Err(VisionError::Config(format!(
                "near_black_threshold {} outside 0.0-1.0",
                self.near_black_threshold
            )));
        }
        if self.stage_weights.iter().any(|w| *w < 0.0)
            || self.stage_weights.iter().sum::<f32>() <= 0.0
        {
            return Err(VisionError::Config(
                "stage_weights must be non-negative with a positive sum".into(),
            ));
        }
        Ok(())
    }
}
