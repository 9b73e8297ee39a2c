//! Resource Discovery
//!
//! Turns a model's base identifier into the ordered descriptor set a run will
//! fetch. The primary mesh is always included and required; everything else is
//! optional and either taken from an explicit configuration list or found by
//! probing naming-convention candidates.

use crate::assets::descriptor::{ResourceDescriptor, ResourceRole, sort_by_priority};
use crate::assets::io::AssetTransport;
use crate::config::{DiscoveryConventions, ModelConfig};
use crate::errors::{Result, VisionError};

/// Builds the descriptor set for a configured model.
///
/// Fails fast with [`VisionError::RequiredResourceMissing`] when the primary
/// mesh is absent. Missing optional candidates are logged and skipped.
pub async fn discover<T: AssetTransport>(
    transport: &T,
    model: &ModelConfig,
    conventions: &DiscoveryConventions,
) -> Result<Vec<ResourceDescriptor>> {
    let base = model.base_name();
    let primary = conventions.primary_name(base);
    ensure_required(transport, &primary).await?;

    let mut descriptors = vec![ResourceDescriptor::primary(primary)];

    if conventions.probe_metadata {
        let uri = conventions.metadata_name(base);
        if probe_optional(transport, &uri).await {
            descriptors.push(ResourceDescriptor::metadata(uri));
        }
    }

    match &model.overlays {
        Some(list) => descriptors.extend(list.iter().map(ResourceDescriptor::overlay)),
        None => {
            for uri in conventions.overlay_candidates(base) {
                if probe_optional(transport, &uri).await {
                    descriptors.push(ResourceDescriptor::overlay(uri));
                }
            }
        }
    }

    match &model.textures {
        Some(list) => descriptors.extend(list.iter().map(ResourceDescriptor::texture)),
        None => {
            for uri in conventions.texture_candidates(base) {
                if probe_optional(transport, &uri).await {
                    descriptors.push(ResourceDescriptor::texture(uri));
                }
            }
        }
    }

    sort_by_priority(&mut descriptors);

    log::info!(
        "Discovered {} resources for '{}' ({} overlays, {} textures)",
        descriptors.len(),
        model.id,
        count_role(&descriptors, ResourceRole::OverlayMesh),
        count_role(&descriptors, ResourceRole::Texture),
    );
    Ok(descriptors)
}

/// Probes every required descriptor of a caller-supplied set.
///
/// The set must contain a primary mesh; optional entries are left for the
/// fetch stage to try.
pub async fn verify_required<T: AssetTransport>(
    transport: &T,
    descriptors: &[ResourceDescriptor],
) -> Result<()> {
    if !descriptors
        .iter()
        .any(|d| d.role == ResourceRole::PrimaryMesh)
    {
        return Err(VisionError::NoPrimaryMesh);
    }
    for descriptor in descriptors.iter().filter(|d| d.required) {
        ensure_required(transport, &descriptor.uri).await?;
    }
    Ok(())
}

async fn ensure_required<T: AssetTransport>(transport: &T, uri: &str) -> Result<()> {
    match transport.probe(uri).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(VisionError::RequiredResourceMissing {
            uri: uri.to_string(),
        }),
        Err(e) if e.is_not_found() => Err(VisionError::RequiredResourceMissing {
            uri: uri.to_string(),
        }),
        Err(e) => Err(VisionError::RequiredFetchFailed {
            uri: uri.to_string(),
            source: Box::new(e),
        }),
    }
}

/// Existence check for an optional candidate. Probe failures count as absent.
async fn probe_optional<T: AssetTransport>(transport: &T, uri: &str) -> bool {
    match transport.probe(uri).await {
        Ok(found) => {
            if !found {
                log::debug!("Optional resource not present: {uri}");
            }
            found
        }
        Err(e) => {
            log::warn!("Probe failed for optional resource {uri}: {e}");
            false
        }
    }
}

fn count_role(descriptors: &[ResourceDescriptor], role: ResourceRole) -> usize {
    descriptors.iter().filter(|d| d.role == role).count()
}
