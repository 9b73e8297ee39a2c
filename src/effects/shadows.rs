use serde::Serialize;

use crate::backend::LightId;
use crate::backend::capabilities::{Capabilities, CapabilityProfile};
use crate::effects::QualityTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShadowFilter {
    Poisson,
    Pcf,
    ContactHardening,
}

/// Parameters of the directional shadow generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowParams {
    pub map_size: u32,
    pub filter: ShadowFilter,
    pub bias: f32,
    pub darkness: f32,
    /// Light the generator renders from; filled in by the orchestrator.
    #[serde(skip)]
    pub light: Option<LightId>,
}

impl ShadowParams {
    #[must_use]
    pub fn preset(quality: QualityTier, profile: CapabilityProfile, caps: &Capabilities) -> Self {
        let filter = match (profile, quality) {
            // PCF needs depth-comparison samplers on float targets.
            (CapabilityProfile::Legacy, _) | (_, QualityTier::Low) => ShadowFilter::Poisson,
            (CapabilityProfile::Modern, QualityTier::Medium) => ShadowFilter::Pcf,
            (CapabilityProfile::Modern, QualityTier::High) => ShadowFilter::ContactHardening,
        };
        Self {
            map_size: quality.pick([1024, 2048, 4096]).min(caps.max_texture_size),
            filter,
            bias: quality.pick([0.0008, 0.0005, 0.0003]),
            darkness: 0.35,
            light: None,
        }
    }

    #[must_use]
    pub fn with_light(mut self, light: LightId) -> Self {
        self.light = Some(light);
        self
    }
}
