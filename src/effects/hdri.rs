//! HDRI environment lighting.
//!
//! HDRI and the standard directional/ambient rig are mutually exclusive.
//! Enabling the environment snapshots the rig's intensities and dims it;
//! disabling restores the snapshot exactly. Re-initializing an already active
//! environment keeps the original snapshot, so a reconfigure never captures
//! the dimmed values.

use serde::Serialize;

use crate::backend::capabilities::{CapabilityProfile, EnvironmentFormat};
use crate::backend::{RenderBackend, SceneId};
use crate::config::HdriConfig;
use crate::effects::state::{EffectSlot, EffectState};
use crate::effects::{EffectParams, QualityTier};
use crate::scene::light::LightRig;

/// Parameters of one environment instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentParams {
    /// Fully resolved environment texture location.
    pub url: String,
    pub intensity: f32,
    /// Y-axis rotation in radians.
    pub rotation: f32,
    /// Edge length of the generated environment cube.
    pub resolution: u32,
    pub format: EnvironmentFormat,
}

impl EnvironmentParams {
    #[must_use]
    pub fn from_config(
        config: &HdriConfig,
        url: String,
        quality: QualityTier,
        profile: CapabilityProfile,
    ) -> Self {
        Self {
            url,
            intensity: config.brightness,
            rotation: config.rotation_radians(),
            resolution: quality.pick([128, 256, 512]),
            format: profile.environment_format(),
        }
    }
}

/// Switches the scene to environment lighting.
pub fn enable_hdri<B: RenderBackend + ?Sized>(
    slot: &mut EffectSlot,
    lights: &mut LightRig,
    backend: &mut B,
    scene: SceneId,
    params: EnvironmentParams,
    quality: QualityTier,
) -> EffectState {
    let was_active = slot.is_active();

    if !was_active && let Err(e) = lights.dim_for_environment(backend) {
        log::warn!("Could not dim standard lights: {e}");
    }

    let state = slot
        .initialize(backend, scene, None, EffectParams::Hdri(params), quality)
        .clone();

    if !state.is_active() {
        restore_lights(lights, backend);
    }
    state
}

/// Removes the environment and restores the standard lights.
pub fn disable_hdri<B: RenderBackend + ?Sized>(
    slot: &mut EffectSlot,
    lights: &mut LightRig,
    backend: &mut B,
) -> EffectState {
    let state = slot.dispose(backend).clone();
    restore_lights(lights, backend);
    state
}

fn restore_lights<B: RenderBackend + ?Sized>(lights: &mut LightRig, backend: &mut B) {
    if let Err(e) = lights.restore(backend) {
        log::warn!("Could not restore standard lights: {e}");
    }
}
