use crate::assets::descriptor::LoadManifest;
use crate::backend::{CameraId, MeshId, SceneId};
use crate::config::LightingConfig;
use crate::effects::{EffectKind, EffectState, SceneEffects};
use crate::scene::light::LightRig;
use crate::scene::metadata::ModelMetadata;

/// A fully assembled scene, owned by the caller of a successful load.
///
/// Dropping the handle does not release backend objects; pass it to
/// [`Viewer::dispose_scene`](crate::pipeline::Viewer::dispose_scene).
#[derive(Debug)]
pub struct SceneHandle {
    pub id: SceneId,
    pub model_id: String,
    pub camera: CameraId,
    pub meshes: Vec<MeshId>,
    pub shadow_casters: Vec<MeshId>,
    pub lights: LightRig,
    pub effects: SceneEffects,
    pub manifest: LoadManifest,
    pub metadata: ModelMetadata,
    pub lighting: LightingConfig,
}

impl SceneHandle {
    #[inline]
    #[must_use]
    pub fn effect(&self, kind: EffectKind) -> &EffectState {
        self.effects.state(kind)
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or(&self.model_id)
    }
}
