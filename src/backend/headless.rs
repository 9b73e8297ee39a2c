//! In-process rendering backend.
//!
//! `HeadlessBackend` implements the whole [`RenderBackend`] contract without a
//! GPU: models are parsed with the `gltf` crate, every object lives in a
//! slot map, and every engine call is counted in [`BackendStats`]. It backs
//! the demo's dry runs and the integration tests, and doubles as the reference
//! for what a real engine binding has to do.

use base64::Engine as _;
use glam::{Vec3, Vec4};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::backend::{
    CameraId, Capabilities, ColorEncoding, EffectId, ImportedModel, LightId, MaterialDesc,
    MaterialId, MeshDesc, MeshId, RenderBackend, SceneId, TextureBinding, TextureResolver,
    TextureSource,
};
use crate::backend::capabilities::EnvironmentFormat;
use crate::effects::{EffectKind, EffectParams};
use crate::errors::{Result, VisionError};
use crate::scene::light::Light;

/// Counters of backend calls.
#[derive(Debug, Clone, Default)]
pub struct BackendStats {
    pub scenes_created: usize,
    pub scenes_disposed: usize,
    pub imports: usize,
    pub import_failures: usize,
    pub effects_created: FxHashMap<EffectKind, usize>,
    pub effects_disposed: FxHashMap<EffectKind, usize>,
    /// Every image request the importer made, with its resolution.
    pub texture_requests: Vec<(String, TextureSource)>,
}

impl BackendStats {
    #[must_use]
    pub fn created(&self, kind: EffectKind) -> usize {
        self.effects_created.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn disposed(&self, kind: EffectKind) -> usize {
        self.effects_disposed.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct SceneRecord {
    meshes: Vec<MeshId>,
    materials: Vec<MaterialId>,
    cameras: Vec<CameraId>,
    lights: Vec<LightId>,
    effects: Vec<EffectId>,
    shadow_casters: Vec<MeshId>,
}

#[derive(Debug)]
struct CameraRecord {
    scene: SceneId,
    position: Vec3,
    target: Vec3,
}

#[derive(Debug)]
struct LightRecord {
    light: Light,
    intensity: f32,
}

#[derive(Debug)]
struct EffectRecord {
    scene: SceneId,
    params: EffectParams,
    cameras: Vec<CameraId>,
}

pub struct HeadlessBackend {
    capabilities: Capabilities,
    scenes: SlotMap<SceneId, SceneRecord>,
    meshes: SlotMap<MeshId, MeshDesc>,
    materials: SlotMap<MaterialId, MaterialDesc>,
    cameras: SlotMap<CameraId, CameraRecord>,
    lights: SlotMap<LightId, LightRecord>,
    effects: SlotMap<EffectId, EffectRecord>,
    failing_effects: FxHashSet<EffectKind>,
    failing_imports: FxHashSet<String>,
    stats: BackendStats,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::modern())
    }

    #[must_use]
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            scenes: SlotMap::default(),
            meshes: SlotMap::default(),
            materials: SlotMap::default(),
            cameras: SlotMap::default(),
            lights: SlotMap::default(),
            effects: SlotMap::default(),
            failing_effects: FxHashSet::default(),
            failing_imports: FxHashSet::default(),
            stats: BackendStats::default(),
        }
    }

    /// Makes every future creation of `kind` fail.
    pub fn fail_effect(&mut self, kind: EffectKind) {
        self.failing_effects.insert(kind);
    }

    /// Makes every future import of the payload labelled `label` fail.
    pub fn fail_import(&mut self, label: &str) {
        self.failing_imports.insert(label.to_string());
    }

    #[must_use]
    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    #[must_use]
    pub fn is_scene_live(&self, scene: SceneId) -> bool {
        self.scenes.contains_key(scene)
    }

    #[must_use]
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    #[must_use]
    pub fn material(&self, material: MaterialId) -> Option<&MaterialDesc> {
        self.materials.get(material)
    }

    #[must_use]
    pub fn light(&self, light: LightId) -> Option<&Light> {
        self.lights.get(light).map(|r| &r.light)
    }

    #[must_use]
    pub fn camera_position(&self, camera: CameraId) -> Option<(Vec3, Vec3)> {
        self.cameras.get(camera).map(|c| (c.position, c.target))
    }

    #[must_use]
    pub fn shadow_casters(&self, scene: SceneId) -> &[MeshId] {
        self.scenes
            .get(scene)
            .map_or(&[][..], |s| s.shadow_casters.as_slice())
    }

    /// Live effect instances of `kind` across all scenes.
    #[must_use]
    pub fn live_effects(&self, kind: EffectKind) -> usize {
        self.effects
            .values()
            .filter(|e| e.params.kind() == kind)
            .count()
    }

    #[must_use]
    pub fn effect_params(&self, effect: EffectId) -> Option<&EffectParams> {
        self.effects.get(effect).map(|e| &e.params)
    }

    #[must_use]
    pub fn effect_cameras(&self, effect: EffectId) -> &[CameraId] {
        self.effects
            .get(effect)
            .map_or(&[][..], |e| e.cameras.as_slice())
    }

    fn scene_mut(&mut self, scene: SceneId) -> Result<&mut SceneRecord> {
        self.scenes
            .get_mut(scene)
            .ok_or_else(|| VisionError::UnknownObject(format!("scene {scene:?}")))
    }

    fn remove_effect(&mut self, effect: EffectId) -> Result<()> {
        let record = self
            .effects
            .remove(effect)
            .ok_or_else(|| VisionError::Disposal(format!("unknown effect {effect:?}")))?;
        if let Some(scene) = self.scenes.get_mut(record.scene) {
            scene.effects.retain(|e| *e != effect);
        }
        *self
            .stats
            .effects_disposed
            .entry(record.params.kind())
            .or_default() += 1;
        Ok(())
    }

    fn check_effect_support(&self, params: &EffectParams) -> Result<()> {
        let kind = params.kind();
        if self.failing_effects.contains(&kind) {
            return Err(VisionError::EffectInit {
                kind,
                reason: "backend refused to create the effect".into(),
            });
        }
        let unsupported = match params {
            EffectParams::Ssao(_) => !self.capabilities.ssao,
            EffectParams::Hdri(p) => {
                p.format == EnvironmentFormat::Prefiltered && !self.capabilities.hdr_environment
            }
            EffectParams::Shadows(p) => p.light.is_none_or(|l| !self.lights.contains_key(l)),
        };
        if unsupported {
            return Err(VisionError::EffectInit {
                kind,
                reason: "not supported by this device".into(),
            });
        }
        Ok(())
    }

    fn resolve_image(
        label: &str,
        image: &gltf::Image<'_>,
        resolver: &dyn TextureResolver,
    ) -> Result<(String, TextureSource)> {
        match image.source() {
            gltf::image::Source::View { view, .. } => Ok((
                image
                    .name()
                    .map_or_else(|| format!("{label}#image{}", image.index()), str::to_string),
                TextureSource::Embedded {
                    byte_length: view.length(),
                },
            )),
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                let (_, data) = uri.split_once(',').ok_or_else(|| VisionError::Import {
                    label: label.to_string(),
                    reason: format!("malformed data URI on image {}", image.index()),
                })?;
                let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
                Ok((
                    format!("{label}#image{}", image.index()),
                    TextureSource::Embedded {
                        byte_length: bytes.len(),
                    },
                ))
            }
            gltf::image::Source::Uri { uri, .. } => Ok((uri.to_string(), resolver.resolve(uri))),
        }
    }
}

fn import_error(label: &str, reason: impl ToString) -> VisionError {
    VisionError::Import {
        label: label.to_string(),
        reason: reason.to_string(),
    }
}

impl RenderBackend for HeadlessBackend {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_scene(&mut self) -> Result<SceneId> {
        self.stats.scenes_created += 1;
        Ok(self.scenes.insert(SceneRecord::default()))
    }

    fn dispose_scene(&mut self, scene: SceneId) -> Result<()> {
        let Some(record) = self.scenes.remove(scene) else {
            return Err(VisionError::Disposal(format!("unknown scene {scene:?}")));
        };
        for effect in record.effects {
            if let Some(e) = self.effects.remove(effect) {
                *self.stats.effects_disposed.entry(e.params.kind()).or_default() += 1;
            }
        }
        for mesh in record.meshes {
            self.meshes.remove(mesh);
        }
        for material in record.materials {
            self.materials.remove(material);
        }
        for camera in record.cameras {
            self.cameras.remove(camera);
        }
        for light in record.lights {
            self.lights.remove(light);
        }
        self.stats.scenes_disposed += 1;
        Ok(())
    }

    fn import_model(
        &mut self,
        scene: SceneId,
        label: &str,
        payload: &[u8],
        resolver: &dyn TextureResolver,
    ) -> Result<ImportedModel> {
        self.scene_mut(scene)?;
        self.stats.imports += 1;

        if self.failing_imports.contains(label) {
            self.stats.import_failures += 1;
            return Err(import_error(label, "import rejected by backend"));
        }

        let gltf = match gltf::Gltf::from_slice(payload) {
            Ok(gltf) => gltf,
            Err(e) => {
                self.stats.import_failures += 1;
                return Err(import_error(label, e));
            }
        };
        if gltf.meshes().next().is_none() {
            self.stats.import_failures += 1;
            return Err(import_error(label, "model contains no meshes"));
        }

        let mut images = Vec::new();
        for image in gltf.images() {
            let resolved = Self::resolve_image(label, &image, resolver)?;
            self.stats.texture_requests.push(resolved.clone());
            images.push(resolved);
        }
        let bind = |texture: gltf::Texture<'_>| -> Option<TextureBinding> {
            let (requested, source) = images.get(texture.source().index())?.clone();
            Some(TextureBinding {
                requested,
                source,
                encoding: ColorEncoding::Unspecified,
            })
        };

        let mut imported = ImportedModel::default();

        for material in gltf.materials() {
            let pbr = material.pbr_metallic_roughness();
            let desc = MaterialDesc {
                name: material.name().map_or_else(
                    || format!("{label}#material{}", imported.materials.len()),
                    str::to_string,
                ),
                base_color: Vec4::from_array(pbr.base_color_factor()),
                base_color_texture: pbr.base_color_texture().and_then(|info| bind(info.texture())),
                normal_texture: material.normal_texture().and_then(|n| bind(n.texture())),
            };
            imported.materials.push(self.materials.insert(desc));
        }

        let mut default_material = None;
        for mesh in gltf.meshes() {
            let material = match mesh.primitives().find_map(|p| p.material().index()) {
                Some(index) => imported.materials.get(index).copied(),
                None => Some(*default_material.get_or_insert_with(|| {
                    let id = self.materials.insert(MaterialDesc {
                        name: format!("{label}#default"),
                        base_color: Vec4::ONE,
                        base_color_texture: None,
                        normal_texture: None,
                    });
                    imported.materials.push(id);
                    id
                })),
            };
            let name = mesh
                .name()
                .map_or_else(|| format!("{label}#mesh{}", mesh.index()), str::to_string);
            imported.meshes.push(self.meshes.insert(MeshDesc {
                name,
                material,
                source: label.to_string(),
            }));
        }

        let record = self.scene_mut(scene)?;
        record.meshes.extend_from_slice(&imported.meshes);
        record.materials.extend_from_slice(&imported.materials);

        log::debug!(
            "Imported {label}: {} meshes, {} materials, {} images",
            imported.meshes.len(),
            imported.materials.len(),
            images.len()
        );
        Ok(imported)
    }

    fn mesh(&self, mesh: MeshId) -> Option<&MeshDesc> {
        self.meshes.get(mesh)
    }

    fn material_mut(&mut self, material: MaterialId) -> Option<&mut MaterialDesc> {
        self.materials.get_mut(material)
    }

    fn add_shadow_caster(&mut self, scene: SceneId, mesh: MeshId) -> Result<()> {
        if !self.meshes.contains_key(mesh) {
            return Err(VisionError::UnknownObject(format!("mesh {mesh:?}")));
        }
        let record = self.scene_mut(scene)?;
        if !record.shadow_casters.contains(&mesh) {
            record.shadow_casters.push(mesh);
        }
        Ok(())
    }

    fn create_camera(&mut self, scene: SceneId, position: Vec3, target: Vec3) -> Result<CameraId> {
        self.scene_mut(scene)?;
        let id = self.cameras.insert(CameraRecord {
            scene,
            position,
            target,
        });
        self.scene_mut(scene)?.cameras.push(id);
        Ok(id)
    }

    fn create_light(&mut self, scene: SceneId, light: &Light) -> Result<LightId> {
        self.scene_mut(scene)?;
        let id = self.lights.insert(LightRecord {
            light: light.clone(),
            intensity: light.intensity,
        });
        self.scene_mut(scene)?.lights.push(id);
        Ok(id)
    }

    fn light_intensity(&self, light: LightId) -> Option<f32> {
        self.lights.get(light).map(|r| r.intensity)
    }

    fn set_light_intensity(&mut self, light: LightId, intensity: f32) -> Result<()> {
        let record = self
            .lights
            .get_mut(light)
            .ok_or_else(|| VisionError::UnknownObject(format!("light {light:?}")))?;
        record.intensity = intensity;
        Ok(())
    }

    fn create_effect(&mut self, scene: SceneId, params: &EffectParams) -> Result<EffectId> {
        self.scene_mut(scene)?;
        self.check_effect_support(params)?;

        let id = self.effects.insert(EffectRecord {
            scene,
            params: params.clone(),
            cameras: Vec::new(),
        });
        self.scene_mut(scene)?.effects.push(id);
        *self.stats.effects_created.entry(params.kind()).or_default() += 1;
        Ok(id)
    }

    fn attach_to_camera(&mut self, effect: EffectId, camera: CameraId) -> Result<()> {
        let camera_scene = self
            .cameras
            .get(camera)
            .map(|c| c.scene)
            .ok_or_else(|| VisionError::UnknownObject(format!("camera {camera:?}")))?;
        let record = self
            .effects
            .get_mut(effect)
            .ok_or_else(|| VisionError::UnknownObject(format!("effect {effect:?}")))?;
        if record.scene != camera_scene {
            return Err(VisionError::UnknownObject(format!(
                "camera {camera:?} belongs to another scene"
            )));
        }
        if !record.cameras.contains(&camera) {
            record.cameras.push(camera);
        }
        Ok(())
    }

    fn detach_from_camera(&mut self, effect: EffectId, camera: CameraId) -> Result<()> {
        let record = self
            .effects
            .get_mut(effect)
            .ok_or_else(|| VisionError::Disposal(format!("unknown effect {effect:?}")))?;
        let before = record.cameras.len();
        record.cameras.retain(|c| *c != camera);
        if record.cameras.len() == before {
            return Err(VisionError::Disposal(format!(
                "effect {effect:?} was not attached to camera {camera:?}"
            )));
        }
        Ok(())
    }

    fn dispose_effect(&mut self, effect: EffectId) -> Result<()> {
        self.remove_effect(effect)
    }
}
