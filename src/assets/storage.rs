use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap, new_key_type};
use uuid::Uuid;

new_key_type! {
    /// Run-local handle to a fetched payload (the engine-consumable "object URL").
    pub struct BlobHandle;
}

/// A fetched resource body.
#[derive(Debug)]
pub struct Blob {
    pub uri: String,
    pub bytes: Arc<[u8]>,
}

// Internal data structure, protected by a lock.
#[derive(Default)]
struct StorageInner {
    map: SlotMap<BlobHandle, Arc<Blob>>,
    lookup: FxHashMap<String, BlobHandle>,
}

/// Registry of payloads fetched during a single pipeline run.
///
/// Every handle is released when the run ends, successful or not, so payloads
/// never outlive the descriptors that reference them.
pub struct BlobStore {
    inner: RwLock<StorageInner>,
    run_id: Uuid,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::default(),
            run_id: Uuid::new_v4(),
        }
    }

    /// [Write] Registers a payload. Re-adding a URI replaces the previous body.
    pub fn add(&self, uri: &str, bytes: Vec<u8>) -> BlobHandle {
        let mut guard = self.inner.write();
        if let Some(old) = guard.lookup.remove(uri) {
            guard.map.remove(old);
        }
        let handle = guard.map.insert(Arc::new(Blob {
            uri: uri.to_string(),
            bytes: bytes.into(),
        }));
        guard.lookup.insert(uri.to_string(), handle);
        handle
    }

    /// [Read] Gets a payload.
    pub fn get(&self, handle: BlobHandle) -> Option<Arc<Blob>> {
        self.inner.read().map.get(handle).cloned()
    }

    /// [Read] Gets a payload's bytes.
    pub fn bytes(&self, handle: BlobHandle) -> Option<Arc<[u8]>> {
        self.get(handle).map(|b| Arc::clone(&b.bytes))
    }

    pub fn handle_for(&self, uri: &str) -> Option<BlobHandle> {
        self.inner.read().lookup.get(uri).copied()
    }

    /// Engine-facing URL naming a payload of this run.
    #[must_use]
    pub fn blob_url(&self, handle: BlobHandle) -> String {
        format!("blob:valevision/{}/{}", self.run_id, handle.data().as_ffi())
    }

    /// [Write] Releases one payload. Returns `false` if it was already gone.
    pub fn release(&self, handle: BlobHandle) -> bool {
        let mut guard = self.inner.write();
        match guard.map.remove(handle) {
            Some(blob) => {
                guard.lookup.remove(&blob.uri);
                true
            }
            None => false,
        }
    }

    /// [Write] Releases every payload, returning how many were live.
    pub fn release_all(&self) -> usize {
        let mut guard = self.inner.write();
        let count = guard.map.len();
        guard.map.clear();
        guard.lookup.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.read().map.values().map(|b| b.bytes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_get_release() {
        let store = BlobStore::new();
        let h = store.add("wall.png", vec![1, 2, 3]);
        assert_eq!(&*store.bytes(h).unwrap(), &[1, 2, 3]);
        assert_eq!(store.handle_for("wall.png"), Some(h));
        assert!(store.blob_url(h).starts_with("blob:valevision/"));

        assert!(store.release(h));
        assert!(!store.release(h));
        assert!(store.get(h).is_none());
        assert!(store.handle_for("wall.png").is_none());
    }

    #[test]
    fn re_adding_replaces_payload() {
        let store = BlobStore::new();
        let first = store.add("a.bin", vec![1]);
        let second = store.add("a.bin", vec![2, 2]);
        assert!(store.get(first).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 2);
        assert_eq!(store.release_all(), 1);
        assert!(store.get(second).is_none());
        assert!(store.is_empty());
    }
}
