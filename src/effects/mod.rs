//! Environment and post-process effects.
//!
//! - [`hdri`]: environment lighting, mutually exclusive with the standard rig
//! - [`ssao`]: screen-space ambient occlusion presets
//! - [`shadows`]: directional shadow generator presets
//! - [`state`]: the per-effect lifecycle shared by all three
//!
//! Each scene carries at most one live instance per [`EffectKind`], held in
//! [`SceneEffects`].

pub mod hdri;
pub mod quality;
pub mod shadows;
pub mod ssao;
pub mod state;

use serde::{Deserialize, Serialize};

pub use hdri::EnvironmentParams;
pub use quality::QualityTier;
pub use shadows::{ShadowFilter, ShadowParams};
pub use ssao::SsaoParams;
pub use state::{EffectPhase, EffectSlot, EffectState};

use crate::backend::RenderBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Hdri,
    Ssao,
    Shadows,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [EffectKind::Hdri, EffectKind::Ssao, EffectKind::Shadows];

    /// Post-processes render through a camera; the others belong to the scene.
    #[inline]
    #[must_use]
    pub fn is_camera_bound(self) -> bool {
        matches!(self, Self::Ssao)
    }
}

/// Backend creation request for one effect instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EffectParams {
    Hdri(EnvironmentParams),
    Ssao(SsaoParams),
    Shadows(ShadowParams),
}

impl EffectParams {
    #[must_use]
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::Hdri(_) => EffectKind::Hdri,
            Self::Ssao(_) => EffectKind::Ssao,
            Self::Shadows(_) => EffectKind::Shadows,
        }
    }
}

/// The effect slots of one scene.
#[derive(Debug, Clone)]
pub struct SceneEffects {
    hdri: EffectSlot,
    ssao: EffectSlot,
    shadows: EffectSlot,
}

impl Default for SceneEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hdri: EffectSlot::new(EffectKind::Hdri),
            ssao: EffectSlot::new(EffectKind::Ssao),
            shadows: EffectSlot::new(EffectKind::Shadows),
        }
    }

    #[must_use]
    pub fn slot(&self, kind: EffectKind) -> &EffectSlot {
        match kind {
            EffectKind::Hdri => &self.hdri,
            EffectKind::Ssao => &self.ssao,
            EffectKind::Shadows => &self.shadows,
        }
    }

    pub fn slot_mut(&mut self, kind: EffectKind) -> &mut EffectSlot {
        match kind {
            EffectKind::Hdri => &mut self.hdri,
            EffectKind::Ssao => &mut self.ssao,
            EffectKind::Shadows => &mut self.shadows,
        }
    }

    #[must_use]
    pub fn state(&self, kind: EffectKind) -> &EffectState {
        self.slot(kind).state()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        EffectKind::ALL
            .iter()
            .filter(|k| self.slot(**k).is_active())
            .count()
    }

    /// Disposes every effect. Camera-bound post-processes go first.
    pub fn dispose_all<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        for kind in [EffectKind::Ssao, EffectKind::Shadows, EffectKind::Hdri] {
            self.slot_mut(kind).dispose(backend);
        }
    }
}
