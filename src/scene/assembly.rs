//! Scene Assembly Stage
//!
//! Feeds the fetched mesh payloads to the backend importer, with every image
//! request routed through the run's [`TextureInterceptor`]. Assembly then
//! wires up the scene around the imported meshes:
//!
//! 1. optional metadata is parsed (ground meshes, camera start)
//! 2. the primary mesh is imported; failure is fatal
//! 3. overlays are imported; up to `overlay_failure_budget` may fail
//! 4. every mesh except ground/backdrop meshes becomes a shadow caster
//! 5. every imported material is enhanced exactly once
//! 6. the camera and the standard light rig are created

use rustc_hash::FxHashSet;

use crate::assets::descriptor::{LoadManifest, ResourceDescriptor, ResourceRole};
use crate::assets::io::AssetTransport;
use crate::assets::storage::BlobStore;
use crate::backend::{CameraId, MaterialId, MeshId, RenderBackend, SceneId};
use crate::config::{LightingConfig, PipelineSettings};
use crate::errors::{Result, VisionError};
use crate::pipeline::progress::ProgressTracker;
use crate::scene::intercept::TextureInterceptor;
use crate::scene::light::LightRig;
use crate::scene::material::enhance_material;
use crate::scene::metadata::ModelMetadata;

/// Mesh names treated as ground or backdrop when nothing else says so.
const GROUND_NAME_HINTS: [&str; 3] = ["ground", "backdrop", "terrain"];

/// Per-run inputs of [`assemble`] besides the payloads themselves.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyOptions<'a> {
    pub lighting: &'a LightingConfig,
    /// Configured ground meshes, merged with the metadata list.
    pub ground_meshes: &'a [String],
    pub overlay_failure_budget: usize,
    pub near_black_threshold: f32,
}

impl<'a> AssemblyOptions<'a> {
    #[must_use]
    pub fn new(
        lighting: &'a LightingConfig,
        ground_meshes: &'a [String],
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            lighting,
            ground_meshes,
            overlay_failure_budget: settings.overlay_failure_budget,
            near_black_threshold: settings.near_black_threshold,
        }
    }
}

/// Everything assembly created in the scene.
#[derive(Debug)]
pub struct Assembled {
    pub camera: CameraId,
    pub meshes: Vec<MeshId>,
    pub shadow_casters: Vec<MeshId>,
    pub lights: LightRig,
    pub metadata: ModelMetadata,
    pub failed_overlays: Vec<String>,
    pub enhanced_materials: usize,
    pub intercepted_textures: usize,
}

/// Assembles fetched resources into `scene`.
///
/// Overlays that fail import are marked unloaded in `manifest`. On error the
/// scene may hold partial content; the caller disposes it.
pub fn assemble<B, T>(
    backend: &mut B,
    transport: &T,
    scene: SceneId,
    descriptors: &[ResourceDescriptor],
    blobs: &BlobStore,
    manifest: &mut LoadManifest,
    options: &AssemblyOptions<'_>,
    progress: &mut ProgressTracker<'_>,
) -> Result<Assembled>
where
    B: RenderBackend + ?Sized,
    T: AssetTransport,
{
    let metadata = load_metadata(descriptors, blobs, manifest);
    let interceptor = TextureInterceptor::new(descriptors, blobs, transport);

    let primary = descriptors
        .iter()
        .find(|d| d.role == ResourceRole::PrimaryMesh)
        .ok_or(VisionError::NoPrimaryMesh)?;

    let meshes_to_import: Vec<&ResourceDescriptor> = std::iter::once(primary)
        .chain(
            descriptors
                .iter()
                .filter(|d| d.role == ResourceRole::OverlayMesh && d.loaded),
        )
        .collect();
    let step_count = meshes_to_import.len() as f32;

    let mut meshes = Vec::new();
    let mut materials: Vec<MaterialId> = Vec::new();
    let mut failed_overlays = Vec::new();

    for (index, descriptor) in meshes_to_import.into_iter().enumerate() {
        progress.set_stage_fraction(index as f32 / step_count, descriptor.file_name());

        match import_one(backend, scene, descriptor, blobs, &interceptor) {
            Ok(imported) => {
                meshes.extend(imported.meshes);
                materials.extend(imported.materials);
            }
            Err(e) if descriptor.required => {
                log::error!("Import of required {} failed: {e}", descriptor.uri);
                return Err(e);
            }
            Err(e) => {
                log::warn!("Overlay {} failed to import: {e}", descriptor.uri);
                manifest.mark_unloaded(&descriptor.uri);
                failed_overlays.push(descriptor.uri.clone());
                if failed_overlays.len() > options.overlay_failure_budget {
                    return Err(VisionError::OverlayBudgetExceeded {
                        failed: failed_overlays.len(),
                        budget: options.overlay_failure_budget,
                    });
                }
            }
        }
    }

    // Shadows
    let ground: FxHashSet<String> = options
        .ground_meshes
        .iter()
        .chain(&metadata.ground_meshes)
        .map(|name| name.to_ascii_lowercase())
        .collect();
    let mut shadow_casters = Vec::with_capacity(meshes.len());
    for &mesh in &meshes {
        let Some(desc) = backend.mesh(mesh) else {
            continue;
        };
        if is_ground_mesh(&desc.name, &ground) {
            log::debug!("'{}' receives shadows only", desc.name);
            continue;
        }
        backend.add_shadow_caster(scene, mesh)?;
        shadow_casters.push(mesh);
    }

    // Materials
    let mut seen = FxHashSet::default();
    let mut enhanced_materials = 0;
    for material in materials {
        if !seen.insert(material) {
            continue;
        }
        if let Some(desc) = backend.material_mut(material)
            && enhance_material(desc, options.near_black_threshold).changed()
        {
            enhanced_materials += 1;
        }
    }

    let camera = backend.create_camera(
        scene,
        metadata.camera.position,
        metadata.camera.target,
    )?;
    let lights = LightRig::create(backend, scene, options.lighting)?;

    progress.set_stage_fraction(1.0, "scene ready");
    log::info!(
        "Assembled {} meshes ({} casting shadows), {} materials enhanced, {} textures intercepted",
        meshes.len(),
        shadow_casters.len(),
        enhanced_materials,
        interceptor.hits()
    );

    Ok(Assembled {
        camera,
        meshes,
        shadow_casters,
        lights,
        metadata,
        failed_overlays,
        enhanced_materials,
        intercepted_textures: interceptor.hits(),
    })
}

fn import_one<B, T>(
    backend: &mut B,
    scene: SceneId,
    descriptor: &ResourceDescriptor,
    blobs: &BlobStore,
    interceptor: &TextureInterceptor<'_, T>,
) -> Result<crate::backend::ImportedModel>
where
    B: RenderBackend + ?Sized,
    T: AssetTransport,
{
    let bytes = descriptor
        .payload
        .and_then(|handle| blobs.bytes(handle))
        .ok_or_else(|| VisionError::RequiredResourceMissing {
            uri: descriptor.uri.clone(),
        })?;
    backend.import_model(scene, descriptor.file_name(), &bytes, interceptor)
}

fn load_metadata(
    descriptors: &[ResourceDescriptor],
    blobs: &BlobStore,
    manifest: &mut LoadManifest,
) -> ModelMetadata {
    let Some(descriptor) = descriptors
        .iter()
        .find(|d| d.role == ResourceRole::Metadata && d.loaded)
    else {
        return ModelMetadata::default();
    };
    let Some(bytes) = descriptor.payload.and_then(|h| blobs.bytes(h)) else {
        return ModelMetadata::default();
    };
    match ModelMetadata::from_slice(&bytes) {
        Ok(metadata) => metadata,
        Err(e) => {
            log::warn!("Ignoring unreadable metadata {}: {e}", descriptor.uri);
            manifest.mark_unloaded(&descriptor.uri);
            ModelMetadata::default()
        }
    }
}

fn is_ground_mesh(name: &str, configured: &FxHashSet<String>) -> bool {
    let lower = name.to_ascii_lowercase();
    configured.contains(&lower) || GROUND_NAME_HINTS.iter().any(|hint| lower.contains(hint))
}
