//! Standard light rig.
//!
//! Every scene gets one directional key light and one hemispheric fill. While
//! an HDRI environment is active the rig is dimmed; [`LightRig::restore`]
//! puts back the exact intensities captured when dimming started.

use glam::Vec3;

use crate::backend::{LightId, RenderBackend, SceneId};
use crate::config::LightingConfig;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HemisphericLight {
    pub up: Vec3,
    pub ground_color: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Directional(DirectionalLight),
    Hemispheric(HemisphericLight),
}

/// Description of a light handed to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: String,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    fn with_kind(name: &str, intensity: f32, kind: LightKind) -> Self {
        Self {
            name: name.to_string(),
            color: Vec3::ONE,
            intensity,
            kind,
        }
    }

    #[must_use]
    pub fn new_directional(name: &str, direction: Vec3, intensity: f32) -> Self {
        Self::with_kind(
            name,
            intensity,
            LightKind::Directional(DirectionalLight {
                direction: direction.normalize_or(Vec3::NEG_Y),
            }),
        )
    }

    #[must_use]
    pub fn new_hemispheric(name: &str, intensity: f32) -> Self {
        Self::with_kind(
            name,
            intensity,
            LightKind::Hemispheric(HemisphericLight {
                up: Vec3::Y,
                ground_color: Vec3::splat(0.3),
            }),
        )
    }
}

/// Intensities captured before the environment took over.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSnapshot {
    intensities: Vec<(LightId, f32)>,
}

impl LightSnapshot {
    #[must_use]
    pub fn get(&self, light: LightId) -> Option<f32> {
        self.intensities
            .iter()
            .find(|(id, _)| *id == light)
            .map(|(_, v)| *v)
    }
}

/// The standard sun + sky lights of a scene.
#[derive(Debug, Clone)]
pub struct LightRig {
    pub directional: LightId,
    pub ambient: LightId,
    dim_factor: f32,
    snapshot: Option<LightSnapshot>,
}

impl LightRig {
    /// Creates the rig on the backend.
    pub fn create<B: RenderBackend + ?Sized>(
        backend: &mut B,
        scene: SceneId,
        config: &LightingConfig,
    ) -> Result<Self> {
        let sun = Light::new_directional(
            "sun",
            Vec3::new(-0.5, -1.0, -0.3),
            config.directional_intensity,
        );
        let sky = Light::new_hemispheric("sky", config.ambient_intensity);

        Ok(Self {
            directional: backend.create_light(scene, &sun)?,
            ambient: backend.create_light(scene, &sky)?,
            dim_factor: config.light_dim_factor,
            snapshot: None,
        })
    }

    #[must_use]
    pub fn ids(&self) -> [LightId; 2] {
        [self.directional, self.ambient]
    }

    #[inline]
    #[must_use]
    pub fn is_dimmed(&self) -> bool {
        self.snapshot.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&LightSnapshot> {
        self.snapshot.as_ref()
    }

    /// Snapshots current intensities and scales them by the dim factor.
    /// Does nothing when already dimmed.
    pub fn dim_for_environment<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        if self.snapshot.is_some() {
            return Ok(());
        }
        let mut intensities = Vec::with_capacity(2);
        for id in self.ids() {
            if let Some(value) = backend.light_intensity(id) {
                intensities.push((id, value));
            }
        }
        let snapshot = self.snapshot.insert(LightSnapshot { intensities });
        for &(id, value) in &snapshot.intensities {
            backend.set_light_intensity(id, value * self.dim_factor)?;
        }
        Ok(())
    }

    /// Restores the snapshot exactly. Does nothing when not dimmed.
    pub fn restore<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        let Some(snapshot) = self.snapshot.take() else {
            return Ok(());
        };
        for (id, value) in snapshot.intensities {
            backend.set_light_intensity(id, value)?;
        }
        Ok(())
    }
}
