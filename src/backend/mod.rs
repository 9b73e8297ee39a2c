//! Rendering Engine Seam
//!
//! The pipeline never renders anything itself. Everything engine-specific
//! (model import, materials, lights, cameras, post-processes) goes through the
//! [`RenderBackend`] trait, so the same orchestration drives a real engine
//! binding or the in-process [`HeadlessBackend`].
//!
//! Backend objects are addressed by small copyable keys ([`SceneId`],
//! [`MeshId`], ...). The backend owns the objects; the pipeline only holds keys.

pub mod capabilities;
pub mod headless;

use glam::{Vec3, Vec4};
use serde::Serialize;
use slotmap::new_key_type;

pub use capabilities::{Capabilities, CapabilityProfile};
pub use headless::HeadlessBackend;

use crate::assets::storage::BlobHandle;
use crate::effects::EffectParams;
use crate::errors::Result;
use crate::scene::light::Light;

new_key_type! {
    pub struct SceneId;
    pub struct MeshId;
    pub struct MaterialId;
    pub struct CameraId;
    pub struct LightId;
    pub struct EffectId;
}

// ============================================================================
// Texture interception
// ============================================================================

/// Where the importer takes a texture's pixels from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TextureSource {
    /// A payload already fetched by this run.
    Local {
        #[serde(skip)]
        handle: BlobHandle,
        /// Engine-facing blob URL of the payload.
        url: String,
        byte_length: usize,
    },
    /// Not pre-fetched: the engine loads it from this URL itself.
    Remote(String),
    /// Stored inside the model file (buffer view or data URI).
    Embedded { byte_length: usize },
}

impl TextureSource {
    #[inline]
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// URL-rewrite hook consulted by the importer for every external image.
pub trait TextureResolver {
    fn resolve(&self, requested: &str) -> TextureSource;
}

// ============================================================================
// Imported scene data
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ColorEncoding {
    /// Whatever the importer guessed.
    #[default]
    Unspecified,
    Srgb,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureBinding {
    /// Name the model file used for the image.
    pub requested: String,
    pub source: TextureSource,
    pub encoding: ColorEncoding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialDesc {
    pub name: String,
    pub base_color: Vec4,
    pub base_color_texture: Option<TextureBinding>,
    pub normal_texture: Option<TextureBinding>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDesc {
    pub name: String,
    pub material: Option<MaterialId>,
    /// Label of the payload the mesh was imported from.
    pub source: String,
}

/// Result of one `import_model` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedModel {
    pub meshes: Vec<MeshId>,
    pub materials: Vec<MaterialId>,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Rendering engine operations used by the pipeline.
pub trait RenderBackend {
    /// Raw device capabilities, queried once at startup.
    fn capabilities(&self) -> Capabilities;

    fn create_scene(&mut self) -> Result<SceneId>;

    /// Releases the scene and everything still attached to it.
    fn dispose_scene(&mut self, scene: SceneId) -> Result<()>;

    /// Imports a model payload, requesting every external image through `resolver`.
    fn import_model(
        &mut self,
        scene: SceneId,
        label: &str,
        payload: &[u8],
        resolver: &dyn TextureResolver,
    ) -> Result<ImportedModel>;

    fn mesh(&self, mesh: MeshId) -> Option<&MeshDesc>;

    fn material_mut(&mut self, material: MaterialId) -> Option<&mut MaterialDesc>;

    /// Registers a mesh with the scene's shadow system.
    fn add_shadow_caster(&mut self, scene: SceneId, mesh: MeshId) -> Result<()>;

    fn create_camera(&mut self, scene: SceneId, position: Vec3, target: Vec3) -> Result<CameraId>;

    fn create_light(&mut self, scene: SceneId, light: &Light) -> Result<LightId>;

    fn light_intensity(&self, light: LightId) -> Option<f32>;

    fn set_light_intensity(&mut self, light: LightId, intensity: f32) -> Result<()>;

    fn create_effect(&mut self, scene: SceneId, params: &EffectParams) -> Result<EffectId>;

    fn attach_to_camera(&mut self, effect: EffectId, camera: CameraId) -> Result<()>;

    fn detach_from_camera(&mut self, effect: EffectId, camera: CameraId) -> Result<()>;

    /// Releases the effect's render targets.
    fn dispose_effect(&mut self, effect: EffectId) -> Result<()>;
}
