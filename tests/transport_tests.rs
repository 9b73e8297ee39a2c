//! Transport Tests
//!
//! Tests for:
//! - FileTransport probing, chunked reads and not-found mapping
//! - TransportVariant selection from a configured root
//! - A full pipeline run over the local filesystem

mod common;

use std::path::PathBuf;

use uuid::Uuid;

use valevision::assets::io::{AssetTransport, FileTransport, TransportVariant};
use valevision::backend::HeadlessBackend;
use valevision::config::{DiscoveryConventions, ModelConfig, PipelineSettings};
use valevision::pipeline::{CancellationToken, Viewer};

use common::RecordingSink;

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("valevision-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    fn write(&self, name: &str, bytes: &[u8]) {
        std::fs::write(self.0.join(name), bytes).unwrap();
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

// ============================================================================
// FileTransport
// ============================================================================

#[tokio::test]
async fn file_probe_reports_presence() {
    let dir = TempDir::new();
    dir.write("Villa.glb", b"glTF");
    let transport = FileTransport::new(&dir.0);

    assert!(transport.probe("Villa.glb").await.unwrap());
    assert!(!transport.probe("Villa_Furniture.glb").await.unwrap());
}

#[tokio::test]
async fn file_reads_in_chunks() {
    let dir = TempDir::new();
    let body: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    dir.write("Villa_diffuse.png", &body);
    let transport = FileTransport::new(&dir.0).with_chunk_size(128);

    let mut stream = transport.open("Villa_diffuse.png").await.unwrap();
    assert_eq!(stream.total(), Some(1000));

    let mut chunks = 0;
    let mut read = Vec::new();
    while let Some(chunk) = stream.next_chunk().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 128);
        read.extend_from_slice(&chunk);
        chunks += 1;
    }
    assert!(chunks >= 8);
    assert_eq!(read, body);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = TempDir::new();
    let transport = FileTransport::new(&dir.0);

    let err = transport.open("nothing.glb").await.err().unwrap();
    assert!(err.is_not_found(), "{err:?}");
}

#[test]
fn variant_is_chosen_from_root() {
    assert!(matches!(
        TransportVariant::from_source("./models").unwrap(),
        TransportVariant::File(_)
    ));
    assert!(matches!(
        TransportVariant::from_source("file:///srv/models").unwrap(),
        TransportVariant::File(_)
    ));
    #[cfg(feature = "http")]
    assert!(matches!(
        TransportVariant::from_source("https://cdn.example.com/models").unwrap(),
        TransportVariant::Http(_)
    ));
}

#[cfg(feature = "http")]
#[test]
fn http_urls_resolve_against_root() {
    let transport = TransportVariant::from_source("https://cdn.example.com/models").unwrap();
    assert_eq!(
        transport.resolve_url("Villa_diffuse.png"),
        "https://cdn.example.com/models/Villa_diffuse.png"
    );
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn pipeline_runs_over_the_filesystem() {
    let dir = TempDir::new();
    dir.write("Villa.glb", &common::villa_shell());
    dir.write("Villa_Furniture.glb", &common::simple_model("Sofa"));
    dir.write("Villa_diffuse.png", &[0x89; 300]);

    let transport = FileTransport::new(&dir.0).with_chunk_size(100);
    let mut viewer = Viewer::new(HeadlessBackend::new(), transport, PipelineSettings::default());
    let mut sink = RecordingSink::default();

    let handle = viewer
        .load_configured(
            &ModelConfig::new("Villa"),
            &DiscoveryConventions::default(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(handle.meshes.len(), 3);
    assert_eq!(handle.manifest.loaded_count(), 3);
    assert_eq!(sink.last_percent(), 100.0);

    viewer.dispose_scene(handle);
    assert_eq!(viewer.backend().scene_count(), 0);
}
