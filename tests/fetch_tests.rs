//! Sequential Fetch Tests
//!
//! Tests for:
//! - Priority ordering and blob registration
//! - Optional failures being skipped, required failures aborting
//! - Cooperative cancellation between resources and between chunks
//! - Monotonic byte-level progress

mod common;

use futures::stream;
use pollster::block_on;

use valevision::assets::descriptor::ResourceDescriptor;
use valevision::assets::fetch::fetch_all;
use valevision::assets::io::{AssetTransport, ByteStream, MemoryTransport};
use valevision::assets::storage::BlobStore;
use valevision::config::PipelineSettings;
use valevision::errors::{ErrorClass, Result, VisionError};
use valevision::pipeline::cancel::CancellationToken;
use valevision::pipeline::progress::{LoadProgress, NullSink, ProgressTracker};

use common::RecordingSink;

fn villa_descriptors() -> Vec<ResourceDescriptor> {
    // Deliberately out of priority order.
    vec![
        ResourceDescriptor::texture("Villa_diffuse.png"),
        ResourceDescriptor::overlay("Villa_Furniture.glb"),
        ResourceDescriptor::primary("Villa.glb"),
    ]
}

fn weights() -> [f32; 4] {
    PipelineSettings::default().stage_weights
}

/// Serves real bodies but reports a wildly wrong size for each of them, like
/// a server sending a bogus `Content-Length`.
struct MisreportingTransport {
    inner: MemoryTransport,
    reported: u64,
}

impl AssetTransport for MisreportingTransport {
    async fn probe(&self, uri: &str) -> Result<bool> {
        self.inner.probe(uri).await
    }

    async fn open(&self, uri: &str) -> Result<ByteStream> {
        let body = self.inner.open(uri).await?.read_to_end().await?;
        Ok(ByteStream::new(
            Some(self.reported),
            stream::iter(vec![Ok(body)]),
        ))
    }

    fn resolve_url(&self, uri: &str) -> String {
        self.inner.resolve_url(uri)
    }
}

// ============================================================================
// Ordering and storage
// ============================================================================

#[test]
fn fetch_sorts_and_stores_every_resource() {
    let transport = common::villa_transport();
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    let report = block_on(fetch_all(
        &transport,
        &mut descriptors,
        &blobs,
        &mut tracker,
        &CancellationToken::new(),
    ))
    .unwrap();

    let order: Vec<_> = descriptors.iter().map(|d| d.uri.as_str()).collect();
    assert_eq!(order, ["Villa.glb", "Villa_Furniture.glb", "Villa_diffuse.png"]);
    assert_eq!(report.loaded, 3);
    assert!(report.skipped.is_empty());
    assert_eq!(blobs.len(), 3);

    let texture = &descriptors[2];
    assert!(texture.loaded);
    let bytes = blobs.bytes(texture.payload.unwrap()).unwrap();
    assert_eq!(bytes.len(), 300);
    assert_eq!(report.bytes, blobs.total_bytes() as u64);
}

#[test]
fn each_resource_is_downloaded_once() {
    let transport = common::villa_transport();
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    block_on(fetch_all(
        &transport,
        &mut descriptors,
        &blobs,
        &mut tracker,
        &CancellationToken::new(),
    ))
    .unwrap();

    assert_eq!(transport.total_fetches(), 3);
    assert_eq!(transport.fetch_count("Villa_diffuse.png"), 1);
}

#[test]
fn oversized_reported_size_does_not_abort_the_fetch() {
    let transport = MisreportingTransport {
        inner: common::villa_transport(),
        reported: u64::MAX,
    };
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = RecordingSink::default();

    let report = {
        let mut tracker = ProgressTracker::new(&mut sink, weights());
        block_on(fetch_all(
            &transport,
            &mut descriptors,
            &blobs,
            &mut tracker,
            &CancellationToken::new(),
        ))
        .unwrap()
    };

    assert_eq!(report.loaded, 3);
    let texture = descriptors.iter().find(|d| d.uri == "Villa_diffuse.png").unwrap();
    assert_eq!(blobs.bytes(texture.payload.unwrap()).unwrap().len(), 300);

    // Once every resource is in, the byte totals reflect what actually arrived.
    let last = sink.reports.last().unwrap();
    assert_eq!(last.bytes_total, blobs.total_bytes() as u64);
    assert!(sink.percents().windows(2).all(|w| w[0] <= w[1]));
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn optional_failure_is_skipped() {
    let transport = common::villa_transport();
    transport.fail_on_open("Villa_Furniture.glb");
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    let report = block_on(fetch_all(
        &transport,
        &mut descriptors,
        &blobs,
        &mut tracker,
        &CancellationToken::new(),
    ))
    .unwrap();

    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped, vec!["Villa_Furniture.glb".to_string()]);
    let overlay = descriptors.iter().find(|d| d.uri == "Villa_Furniture.glb").unwrap();
    assert!(!overlay.loaded);
    assert!(overlay.payload.is_none());
    // The texture after the failed overlay is still fetched.
    assert_eq!(transport.fetch_count("Villa_diffuse.png"), 1);
}

#[test]
fn missing_required_resource_is_fatal() {
    let transport = common::villa_transport();
    transport.remove("Villa.glb");
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    let err = block_on(fetch_all(
        &transport,
        &mut descriptors,
        &blobs,
        &mut tracker,
        &CancellationToken::new(),
    ))
    .unwrap_err();

    assert!(matches!(err, VisionError::RequiredResourceMissing { .. }));
    assert_eq!(transport.fetch_count("Villa_Furniture.glb"), 0);
}

#[test]
fn failing_required_resource_keeps_its_cause() {
    let transport = common::villa_transport();
    transport.fail_on_open("Villa.glb");
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    let err = block_on(fetch_all(
        &transport,
        &mut descriptors,
        &blobs,
        &mut tracker,
        &CancellationToken::new(),
    ))
    .unwrap_err();

    match &err {
        VisionError::RequiredFetchFailed { uri, source } => {
            assert_eq!(uri, "Villa.glb");
            assert!(matches!(**source, VisionError::HttpStatus { status: 500, .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.class(), ErrorClass::FatalRequired);
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn cancelled_token_stops_before_first_request() {
    let transport = common::villa_transport();
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = NullSink;
    let mut tracker = ProgressTracker::new(&mut sink, weights());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = block_on(fetch_all(&transport, &mut descriptors, &blobs, &mut tracker, &cancel))
        .unwrap_err();

    assert!(matches!(err, VisionError::Cancelled));
    assert_eq!(err.class(), ErrorClass::Cancelled);
    assert_eq!(transport.total_fetches(), 0);
}

#[test]
fn cancelling_mid_download_abandons_remaining_resources() {
    let transport = common::villa_transport();
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let mut sink = move |p: &LoadProgress| {
        if p.current_label == "Villa_Furniture.glb" {
            trigger.cancel();
        }
    };
    let mut tracker = ProgressTracker::new(&mut sink, weights());

    let err = block_on(fetch_all(&transport, &mut descriptors, &blobs, &mut tracker, &cancel))
        .unwrap_err();

    assert!(matches!(err, VisionError::Cancelled));
    assert_eq!(transport.fetch_count("Villa_Furniture.glb"), 1);
    assert_eq!(transport.fetch_count("Villa_diffuse.png"), 0);
    assert!(!descriptors.iter().any(|d| d.uri == "Villa_Furniture.glb" && d.loaded));
}

// ============================================================================
// Progress
// ============================================================================

#[test]
fn chunked_progress_is_monotonic() {
    let transport = common::villa_transport();
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = RecordingSink::default();

    {
        let mut tracker = ProgressTracker::new(&mut sink, weights());
        block_on(fetch_all(
            &transport,
            &mut descriptors,
            &blobs,
            &mut tracker,
            &CancellationToken::new(),
        ))
        .unwrap();
    }

    let percents = sink.percents();
    // 64-byte chunks: many more reports than resources.
    assert!(percents.len() > 10);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert!(sink.last_percent() < 100.0);

    let last = sink.reports.last().unwrap();
    assert_eq!(last.bytes_loaded, blobs.total_bytes() as u64);
    assert_eq!(last.bytes_total, last.bytes_loaded);
}

#[test]
fn skipped_resource_still_advances_progress() {
    let transport = common::villa_transport();
    transport.fail_on_open("Villa_diffuse.png");
    let blobs = BlobStore::new();
    let mut descriptors = villa_descriptors();
    let mut sink = RecordingSink::default();

    {
        let mut tracker = ProgressTracker::new(&mut sink, weights());
        block_on(fetch_all(
            &transport,
            &mut descriptors,
            &blobs,
            &mut tracker,
            &CancellationToken::new(),
        ))
        .unwrap();
    }

    // Discovery (5) + the full fetch share (80).
    assert!((sink.last_percent() - 85.0).abs() < 1e-3, "{}", sink.last_percent());
}
