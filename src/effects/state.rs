//! Effect lifecycle.
//!
//! Every effect instance moves through
//!
//! ```text
//! Uninitialized ──► Initializing ──► Active ──► Disposed
//!                        ▲  │           │
//!                        │  └─► Disposed│ (init failure)
//!                        └──────────────┘ (reconfigure)
//! ```
//!
//! `Disposed` is terminal for an instance. An [`EffectSlot`] starts a fresh
//! instance when asked to initialize after its previous one was disposed, and
//! always releases the live backend instance before creating a replacement, so
//! repeated toggles never stack render targets.

use serde::Serialize;

use crate::backend::{CameraId, EffectId, RenderBackend, SceneId};
use crate::effects::{EffectKind, EffectParams, QualityTier};
use crate::errors::{Result, VisionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EffectPhase {
    Uninitialized,
    Initializing,
    Active,
    Disposed,
}

impl EffectPhase {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initializing => "Initializing",
            Self::Active => "Active",
            Self::Disposed => "Disposed",
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: EffectPhase) -> bool {
        use EffectPhase::{Active, Disposed, Initializing, Uninitialized};
        matches!(
            (self, next),
            (Uninitialized | Active, Initializing)
                | (Initializing, Active)
                | (Uninitialized | Initializing | Active, Disposed)
        )
    }
}

/// Observable state of one effect on one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectState {
    pub kind: EffectKind,
    pub phase: EffectPhase,
    pub enabled: bool,
    pub quality: QualityTier,
    pub params: Option<EffectParams>,
    /// Camera the effect renders through. Not owned: the scene owns its cameras.
    #[serde(skip)]
    pub attached_camera: Option<CameraId>,
    #[serde(skip)]
    pub instance: Option<EffectId>,
    /// Reason of the last initialization failure.
    pub last_error: Option<String>,
}

impl EffectState {
    #[must_use]
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            phase: EffectPhase::Uninitialized,
            enabled: false,
            quality: QualityTier::default(),
            params: None,
            attached_camera: None,
            instance: None,
            last_error: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == EffectPhase::Active
    }

    pub fn transition(&mut self, next: EffectPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(VisionError::InvalidEffectTransition {
                kind: self.kind,
                from: self.phase.name(),
                to: next.name(),
            });
        }
        log::trace!("{:?}: {} -> {}", self.kind, self.phase.name(), next.name());
        self.phase = next;
        Ok(())
    }
}

/// Holds the single live instance of one effect kind for a scene.
#[derive(Debug, Clone)]
pub struct EffectSlot {
    state: EffectState,
    initializations: u32,
}

impl EffectSlot {
    #[must_use]
    pub fn new(kind: EffectKind) -> Self {
        Self {
            state: EffectState::new(kind),
            initializations: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &EffectState {
        &self.state
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> EffectKind {
        self.state.kind
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Number of initialization attempts made through this slot.
    #[inline]
    #[must_use]
    pub fn initializations(&self) -> u32 {
        self.initializations
    }

    /// Creates (or re-creates) the effect.
    ///
    /// A live instance is detached and disposed first. Initialization failure
    /// leaves the effect disabled and is never escalated; the reason is kept in
    /// [`EffectState::last_error`].
    pub fn initialize<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: SceneId,
        camera: Option<CameraId>,
        params: EffectParams,
        quality: QualityTier,
    ) -> &EffectState {
        debug_assert_eq!(params.kind(), self.state.kind);

        if self.state.phase == EffectPhase::Disposed {
            self.state = EffectState::new(self.state.kind);
        }
        if self.state.phase == EffectPhase::Active {
            log::debug!("Re-initializing {:?}", self.state.kind);
        }
        if let Err(e) = self.state.transition(EffectPhase::Initializing) {
            log::warn!("{e}");
            return &self.state;
        }
        self.release_instance(backend);
        self.initializations += 1;

        self.state.quality = quality;
        self.state.last_error = None;

        match Self::create(backend, scene, camera, &params) {
            Ok(id) => {
                self.state.instance = Some(id);
                self.state.attached_camera = camera;
                self.state.params = Some(params);
                self.state.enabled = true;
                self.state.phase = EffectPhase::Active;
                log::info!("{:?} active ({quality})", self.state.kind);
            }
            Err(e) => {
                log::warn!("{e}; {:?} disabled", self.state.kind);
                self.state.enabled = false;
                self.state.params = None;
                self.state.last_error = Some(e.to_string());
                self.state.phase = EffectPhase::Disposed;
            }
        }
        &self.state
    }

    /// Tears the effect down. Errors are logged, never returned, so disposal
    /// always completes.
    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> &EffectState {
        if self.state.phase == EffectPhase::Disposed {
            return &self.state;
        }
        self.release_instance(backend);
        self.state.enabled = false;
        self.state.phase = EffectPhase::Disposed;
        &self.state
    }

    fn create<B: RenderBackend + ?Sized>(
        backend: &mut B,
        scene: SceneId,
        camera: Option<CameraId>,
        params: &EffectParams,
    ) -> Result<EffectId> {
        let id = backend.create_effect(scene, params)?;
        if let Some(camera) = camera.filter(|_| params.kind().is_camera_bound())
            && let Err(e) = backend.attach_to_camera(id, camera)
        {
            if let Err(dispose_err) = backend.dispose_effect(id) {
                log::warn!("Disposal failed after attach error: {dispose_err}");
            }
            return Err(VisionError::EffectInit {
                kind: params.kind(),
                reason: e.to_string(),
            });
        }
        Ok(id)
    }

    fn release_instance<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        let Some(id) = self.state.instance.take() else {
            return;
        };
        if let Some(camera) = self.state.attached_camera.take()
            && let Err(e) = backend.detach_from_camera(id, camera)
        {
            log::warn!("Failed to detach {:?} from camera: {e}", self.state.kind);
        }
        if let Err(e) = backend.dispose_effect(id) {
            log::warn!("Failed to dispose {:?}: {e}", self.state.kind);
        }
    }
}
