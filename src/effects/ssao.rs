//! SSAO (Screen Space Ambient Occlusion) Presets
//!
//! The caller only ever chooses a [`QualityTier`]; the numeric parameters come
//! from the preset table below and are clamped to what the negotiated
//! [`CapabilityProfile`] can run.
//!
//! | Tier   | Ratio | Samples | Radius | Strength | Blur |
//! |--------|-------|---------|--------|----------|------|
//! | Low    | 0.5   | 8       | 1.0    | 0.8      | no   |
//! | Medium | 0.75  | 16      | 1.5    | 1.0      | yes  |
//! | High   | 1.0   | 32      | 2.0    | 1.2      | yes  |

use serde::Serialize;

use crate::backend::capabilities::{CapabilityProfile, SsaoVariant};
use crate::effects::QualityTier;

/// Parameters of one SSAO pipeline instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SsaoParams {
    pub variant: SsaoVariant,
    /// Render-target size relative to the canvas.
    pub ratio: f32,
    pub samples: u32,
    /// Sampling radius in scene units.
    pub radius: f32,
    pub total_strength: f32,
    pub blur: bool,
}

impl SsaoParams {
    #[must_use]
    pub fn preset(quality: QualityTier, profile: CapabilityProfile) -> Self {
        Self {
            variant: profile.ssao_variant(),
            ratio: quality.pick([0.5, 0.75, 1.0]),
            samples: quality.pick([8, 16, 32]).min(profile.max_ssao_samples()),
            radius: quality.pick([1.0, 1.5, 2.0]),
            total_strength: quality.pick([0.8, 1.0, 1.2]),
            blur: quality != QualityTier::Low,
        }
    }
}
