//! Texture URL interception.
//!
//! Model files reference their external images by relative name. When a model
//! is imported, every such request is routed through a [`TextureInterceptor`]:
//! names matching a texture this run already fetched resolve to that payload,
//! so no image is downloaded twice. Everything else falls through to the
//! transport URL and the engine loads it itself.

use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;

use crate::assets::descriptor::{ResourceDescriptor, ResourceRole};
use crate::assets::io::{AssetTransport, file_name};
use crate::assets::storage::{BlobHandle, BlobStore};
use crate::backend::{TextureResolver, TextureSource};

#[derive(Debug, Clone)]
struct Intercepted {
    handle: BlobHandle,
    url: String,
    byte_length: usize,
}

pub struct TextureInterceptor<'a, T: AssetTransport> {
    // Keyed by lower-cased file name.
    local: FxHashMap<String, Intercepted>,
    transport: &'a T,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<'a, T: AssetTransport> TextureInterceptor<'a, T> {
    /// Indexes every loaded texture descriptor of a run.
    pub fn new(descriptors: &[ResourceDescriptor], blobs: &BlobStore, transport: &'a T) -> Self {
        let mut local = FxHashMap::default();
        for d in descriptors
            .iter()
            .filter(|d| d.role == ResourceRole::Texture && d.loaded)
        {
            let Some(handle) = d.payload else { continue };
            let Some(blob) = blobs.get(handle) else {
                log::warn!("Texture {} has no payload; it will load remotely", d.uri);
                continue;
            };
            local.insert(
                d.file_name().to_ascii_lowercase(),
                Intercepted {
                    handle,
                    url: blobs.blob_url(handle),
                    byte_length: blob.bytes.len(),
                },
            );
        }

        Self {
            local,
            transport,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Number of fetched textures available for interception.
    #[must_use]
    pub fn len(&self) -> usize {
        self.local.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<T: AssetTransport> TextureResolver for TextureInterceptor<'_, T> {
    fn resolve(&self, requested: &str) -> TextureSource {
        let key = file_name(requested).to_ascii_lowercase();
        if let Some(hit) = self.local.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Intercepted texture {requested} -> {}", hit.url);
            return TextureSource::Local {
                handle: hit.handle,
                url: hit.url.clone(),
                byte_length: hit.byte_length,
            };
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        TextureSource::Remote(self.transport.resolve_url(requested))
    }
}
