//! Resource descriptors and the per-run load manifest.

use serde::Serialize;

use crate::assets::io::file_name;
use crate::assets::storage::BlobHandle;

/// What a resource is used for. The declaration order is the fetch priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceRole {
    PrimaryMesh,
    Metadata,
    OverlayMesh,
    Texture,
}

impl ResourceRole {
    /// Lower values are fetched first.
    #[inline]
    #[must_use]
    pub fn priority(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn is_mesh(self) -> bool {
        matches!(self, Self::PrimaryMesh | Self::OverlayMesh)
    }
}

/// One resource a pipeline run will try to fetch.
///
/// Created by discovery, flipped to `loaded` by the fetch stage, and owned by
/// the run that created it. `payload` points into that run's
/// [`BlobStore`](crate::assets::storage::BlobStore) and is cleared when the
/// store is released.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub role: ResourceRole,
    pub required: bool,
    pub loaded: bool,
    pub payload: Option<BlobHandle>,
}

impl ResourceDescriptor {
    fn new(uri: impl Into<String>, role: ResourceRole, required: bool) -> Self {
        Self {
            uri: uri.into(),
            role,
            required,
            loaded: false,
            payload: None,
        }
    }

    /// The required base mesh.
    #[must_use]
    pub fn primary(uri: impl Into<String>) -> Self {
        Self::new(uri, ResourceRole::PrimaryMesh, true)
    }

    #[must_use]
    pub fn overlay(uri: impl Into<String>) -> Self {
        Self::new(uri, ResourceRole::OverlayMesh, false)
    }

    #[must_use]
    pub fn texture(uri: impl Into<String>) -> Self {
        Self::new(uri, ResourceRole::Texture, false)
    }

    #[must_use]
    pub fn metadata(uri: impl Into<String>) -> Self {
        Self::new(uri, ResourceRole::Metadata, false)
    }

    /// Overrides the required flag.
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// File name used for texture interception and logging.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        file_name(&self.uri)
    }
}

/// Sorts descriptors into fetch order, keeping discovery order within a role.
pub fn sort_by_priority(descriptors: &mut [ResourceDescriptor]) {
    descriptors.sort_by_key(|d| d.role.priority());
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub uri: String,
    pub role: ResourceRole,
    pub required: bool,
    pub loaded: bool,
}

/// Which resources a run actually loaded.
///
/// A run that returns a manifest succeeded: every required entry is loaded.
/// Optional entries report their individual outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadManifest {
    pub entries: Vec<ManifestEntry>,
}

impl LoadManifest {
    #[must_use]
    pub fn from_descriptors(descriptors: &[ResourceDescriptor]) -> Self {
        Self {
            entries: descriptors
                .iter()
                .map(|d| ManifestEntry {
                    uri: d.uri.clone(),
                    role: d.role,
                    required: d.required,
                    loaded: d.loaded,
                })
                .collect(),
        }
    }

    /// Marks an entry as not loaded (an overlay that fetched but failed import).
    pub fn mark_unloaded(&mut self, uri: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.uri == uri) {
            entry.loaded = false;
        }
    }

    #[must_use]
    pub fn is_loaded(&self, uri: &str) -> bool {
        self.entries.iter().any(|e| e.uri == uri && e.loaded)
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.uri == uri)
    }

    pub fn loaded_optional(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| !e.required && e.loaded)
    }

    pub fn missing_optional(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().filter(|e| !e.required && !e.loaded)
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.loaded).count()
    }
}
