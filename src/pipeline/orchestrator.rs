//! Pipeline Orchestrator
//!
//! [`Viewer`] sequences Discovery → Fetch → Assembly → Effects for one model
//! at a time and owns the rules that hold across stages:
//!
//! - a new load first disposes whatever scene the previous load left live;
//! - a run either returns a complete [`SceneHandle`] or an error, never a
//!   half-built scene (the backend scene is disposed before the error returns);
//! - every fetched payload is released when the run ends, whatever the outcome;
//! - effect failures disable the effect and never fail the load.

use crate::assets::descriptor::{LoadManifest, ResourceDescriptor, ResourceRole};
use crate::assets::discovery::{discover, verify_required};
use crate::assets::fetch::fetch_all;
use crate::assets::io::{AssetTransport, TransportVariant};
use crate::assets::storage::BlobStore;
use crate::backend::{Capabilities, CapabilityProfile, RenderBackend, SceneId};
use crate::config::{DiscoveryConventions, ModelConfig, PipelineSettings, ViewerConfig};
use crate::effects::hdri::{disable_hdri, enable_hdri};
use crate::effects::{
    EffectKind, EffectParams, EffectState, EnvironmentParams, QualityTier, SceneEffects,
    ShadowParams, SsaoParams,
};
use crate::errors::{Result, VisionError};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::progress::{LoadStage, ProgressSink, ProgressTracker};
use crate::scene::assembly::{AssemblyOptions, assemble};
use crate::scene::handle::SceneHandle;

/// Everything a run needs besides its descriptors.
pub struct PipelineContext<B, T> {
    pub backend: B,
    pub transport: T,
    /// Raw device capabilities, queried once.
    pub capabilities: Capabilities,
    /// Effect implementation family negotiated from `capabilities`.
    pub profile: CapabilityProfile,
    pub settings: PipelineSettings,
}

enum DescriptorSource<'a> {
    Given(Vec<ResourceDescriptor>),
    Discover(&'a DiscoveryConventions),
}

/// Loads models into a rendering backend and manages their effects.
pub struct Viewer<B: RenderBackend, T: AssetTransport> {
    ctx: PipelineContext<B, T>,
    quality: QualityTier,
    live_scene: Option<SceneId>,
}

impl<B: RenderBackend> Viewer<B, TransportVariant> {
    /// Builds a viewer whose transport is picked from `config.transport_root`.
    pub fn from_config(backend: B, config: &ViewerConfig) -> Result<Self> {
        config.validate()?;
        let transport = TransportVariant::from_source(&config.transport_root)?
            .with_chunk_size(config.pipeline.chunk_size);
        Ok(Self::new(backend, transport, config.pipeline.clone()).with_quality(config.quality))
    }
}

impl<B: RenderBackend, T: AssetTransport> Viewer<B, T> {
    pub fn new(backend: B, transport: T, settings: PipelineSettings) -> Self {
        let capabilities = backend.capabilities();
        let profile = CapabilityProfile::negotiate(&capabilities);
        log::info!("Capability profile: {profile:?} ({capabilities:?})");

        Self {
            ctx: PipelineContext {
                backend,
                transport,
                capabilities,
                profile,
                settings,
            },
            quality: QualityTier::default(),
            live_scene: None,
        }
    }

    /// Default quality for models that do not set their own.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = quality;
        self
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &PipelineContext<B, T> {
        &self.ctx
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.ctx.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.ctx.backend
    }

    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.ctx.transport
    }

    #[inline]
    #[must_use]
    pub fn profile(&self) -> CapabilityProfile {
        self.ctx.profile
    }

    #[inline]
    #[must_use]
    pub fn quality(&self) -> QualityTier {
        self.quality
    }

    /// Scene of the most recent successful load, until it is disposed.
    #[inline]
    #[must_use]
    pub fn live_scene(&self) -> Option<SceneId> {
        self.live_scene
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Loads a caller-supplied descriptor set with default lighting.
    pub async fn load_model(
        &mut self,
        descriptors: Vec<ResourceDescriptor>,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SceneHandle> {
        let model = descriptors
            .iter()
            .find(|d| d.role == ResourceRole::PrimaryMesh)
            .map_or_else(
                || ModelConfig::new("model"),
                |d| ModelConfig::new(d.file_name()),
            );
        self.run(&model, DescriptorSource::Given(descriptors), sink, cancel)
            .await
    }

    /// Loads a caller-supplied descriptor set with a model's lighting and effects.
    pub async fn load_model_with(
        &mut self,
        model: &ModelConfig,
        descriptors: Vec<ResourceDescriptor>,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SceneHandle> {
        self.run(model, DescriptorSource::Given(descriptors), sink, cancel)
            .await
    }

    /// Discovers, fetches and assembles a configured model, then attaches its
    /// configured effects.
    pub async fn load_configured(
        &mut self,
        model: &ModelConfig,
        conventions: &DiscoveryConventions,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SceneHandle> {
        self.run(model, DescriptorSource::Discover(conventions), sink, cancel)
            .await
    }

    async fn run(
        &mut self,
        model: &ModelConfig,
        source: DescriptorSource<'_>,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<SceneHandle> {
        self.retire_live_scene();
        log::info!("Loading model '{}'", model.id);

        let blobs = BlobStore::new();
        let outcome = {
            let mut tracker = ProgressTracker::new(sink, self.ctx.settings.stage_weights);
            let outcome = self
                .run_stages(model, source, &blobs, &mut tracker, cancel)
                .await;
            if outcome.is_ok() {
                tracker.complete("Ready");
            }
            outcome
        };

        let released = blobs.release_all();
        log::debug!("Released {released} fetched payloads");

        match &outcome {
            Ok(handle) => {
                self.live_scene = Some(handle.id);
                log::info!(
                    "Model '{}' ready: {} meshes, {} resources loaded",
                    model.id,
                    handle.meshes.len(),
                    handle.manifest.loaded_count()
                );
                sink.on_finished(Ok(&handle.manifest));
            }
            Err(e) => {
                log::error!("Loading model '{}' failed: {e}", model.id);
                sink.on_finished(Err(e));
            }
        }
        outcome
    }

    async fn run_stages(
        &mut self,
        model: &ModelConfig,
        source: DescriptorSource<'_>,
        blobs: &BlobStore,
        tracker: &mut ProgressTracker<'_>,
        cancel: &CancellationToken,
    ) -> Result<SceneHandle> {
        tracker.enter_stage(LoadStage::Discovery);
        let mut descriptors = match source {
            DescriptorSource::Given(descriptors) => {
                verify_required(&self.ctx.transport, &descriptors).await?;
                descriptors
            }
            DescriptorSource::Discover(conventions) => {
                discover(&self.ctx.transport, model, conventions).await?
            }
        };
        cancel.check()?;

        let report =
            fetch_all(&self.ctx.transport, &mut descriptors, blobs, tracker, cancel).await?;
        if !report.skipped.is_empty() {
            log::warn!("{} optional resources unavailable", report.skipped.len());
        }
        let mut manifest = LoadManifest::from_descriptors(&descriptors);
        cancel.check()?;

        tracker.enter_stage(LoadStage::Assembly);
        let scene = self.ctx.backend.create_scene()?;
        let options =
            AssemblyOptions::new(&model.lighting, &model.ground_meshes, &self.ctx.settings);
        let assembled = match assemble(
            &mut self.ctx.backend,
            &self.ctx.transport,
            scene,
            &descriptors,
            blobs,
            &mut manifest,
            &options,
            tracker,
        ) {
            Ok(assembled) => assembled,
            Err(e) => {
                self.discard_scene(scene);
                return Err(e);
            }
        };

        let mut handle = SceneHandle {
            id: scene,
            model_id: model.id.clone(),
            camera: assembled.camera,
            meshes: assembled.meshes,
            shadow_casters: assembled.shadow_casters,
            lights: assembled.lights,
            effects: SceneEffects::new(),
            manifest,
            metadata: assembled.metadata,
            lighting: model.lighting.clone(),
        };

        tracker.enter_stage(LoadStage::Effects);
        self.live_scene = Some(scene);
        let active = self
            .apply_model_effects(&mut handle, model)
            .iter()
            .filter(|s| s.is_active())
            .count();
        log::debug!("{active} effects active on '{}'", model.id);

        Ok(handle)
    }

    /// Disposes the scene left live by a previous load, if any.
    fn retire_live_scene(&mut self) {
        if let Some(previous) = self.live_scene.take() {
            log::info!("Disposing previous scene before a new load");
            self.discard_scene(previous);
        }
    }

    fn discard_scene(&mut self, scene: SceneId) {
        if let Err(e) = self.ctx.backend.dispose_scene(scene) {
            log::warn!("Scene disposal failed: {e}");
        }
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Attaches every effect the model enables, at the model's quality tier.
    pub fn apply_model_effects(
        &mut self,
        handle: &mut SceneHandle,
        model: &ModelConfig,
    ) -> Vec<EffectState> {
        let quality = model.quality.unwrap_or(self.quality);
        let flags = model.effects;
        [
            (EffectKind::Hdri, flags.hdri),
            (EffectKind::Shadows, flags.shadows),
            (EffectKind::Ssao, flags.ssao),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(kind, _)| self.attach_effect(handle, kind, quality))
        .collect()
    }

    /// Creates (or re-creates) an effect on a scene.
    ///
    /// Any live instance of the same kind is disposed first. Failure leaves the
    /// effect disabled with the reason in [`EffectState::last_error`].
    pub fn attach_effect(
        &mut self,
        handle: &mut SceneHandle,
        kind: EffectKind,
        quality: QualityTier,
    ) -> EffectState {
        if self.live_scene != Some(handle.id) {
            return Self::refuse(handle, kind, "scene is no longer live");
        }
        let profile = self.ctx.profile;
        let backend = &mut self.ctx.backend;

        match kind {
            EffectKind::Hdri => {
                let Some(config) = handle.lighting.hdri.clone() else {
                    return Self::refuse(handle, kind, "no HDRI environment configured");
                };
                let url = self.ctx.transport.resolve_url(&config.url);
                let params = EnvironmentParams::from_config(&config, url, quality, profile);
                enable_hdri(
                    handle.effects.slot_mut(EffectKind::Hdri),
                    &mut handle.lights,
                    backend,
                    handle.id,
                    params,
                    quality,
                )
            }
            EffectKind::Ssao => handle
                .effects
                .slot_mut(kind)
                .initialize(
                    backend,
                    handle.id,
                    Some(handle.camera),
                    EffectParams::Ssao(SsaoParams::preset(quality, profile)),
                    quality,
                )
                .clone(),
            EffectKind::Shadows => {
                let params = ShadowParams::preset(quality, profile, &self.ctx.capabilities)
                    .with_light(handle.lights.directional);
                handle
                    .effects
                    .slot_mut(kind)
                    .initialize(
                        backend,
                        handle.id,
                        None,
                        EffectParams::Shadows(params),
                        quality,
                    )
                    .clone()
            }
        }
    }

    /// Turns an effect off. HDRI restores the standard lights.
    pub fn dispose_effect(&mut self, handle: &mut SceneHandle, kind: EffectKind) -> EffectState {
        let backend = &mut self.ctx.backend;
        let state = match kind {
            EffectKind::Hdri => disable_hdri(
                handle.effects.slot_mut(EffectKind::Hdri),
                &mut handle.lights,
                backend,
            ),
            _ => handle.effects.slot_mut(kind).dispose(backend).clone(),
        };
        log::info!("{kind:?} disposed");
        state
    }

    fn refuse(handle: &SceneHandle, kind: EffectKind, reason: &str) -> EffectState {
        let error = VisionError::EffectInit {
            kind,
            reason: reason.to_string(),
        };
        log::warn!("{error}; {kind:?} disabled");
        let mut state = handle.effects.state(kind).clone();
        state.last_error = Some(error.to_string());
        state
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Disposes a scene and everything attached to it.
    ///
    /// Effects go first, then the backend scene. Errors are logged, never
    /// returned, so disposal always completes. A handle whose scene was
    /// already retired by a newer load is ignored.
    pub fn dispose_scene(&mut self, mut handle: SceneHandle) {
        if self.live_scene != Some(handle.id) {
            log::debug!("Scene of '{}' already disposed", handle.model_id);
            return;
        }
        self.live_scene = None;

        let backend = &mut self.ctx.backend;
        if handle.effects.slot(EffectKind::Hdri).is_active() {
            disable_hdri(
                handle.effects.slot_mut(EffectKind::Hdri),
                &mut handle.lights,
                backend,
            );
        }
        handle.effects.dispose_all(backend);

        match backend.dispose_scene(handle.id) {
            Ok(()) => log::info!("Disposed scene of '{}'", handle.model_id),
            Err(e) => log::warn!("Disposing scene of '{}': {e}", handle.model_id),
        }
    }
}
