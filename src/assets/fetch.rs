//! Sequential Fetch Stage
//!
//! Resources are fetched one after another in priority order (primary mesh,
//! metadata, overlays, textures). Sequential fetching keeps progress
//! deterministic and makes every failure attributable to a single resource.

use crate::assets::descriptor::{ResourceDescriptor, sort_by_priority};
use crate::assets::io::{AssetTransport, preallocation_hint};
use crate::assets::storage::BlobStore;
use crate::errors::{Result, VisionError};
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::progress::ProgressTracker;

/// Summary of a fetch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub loaded: usize,
    /// Optional resources that could not be fetched.
    pub skipped: Vec<String>,
    pub bytes: u64,
}

/// Fetches every descriptor into `blobs`.
///
/// A failing required resource aborts with
/// [`VisionError::RequiredFetchFailed`] (or `RequiredResourceMissing` when the
/// transport reports it absent). A failing optional resource is logged and
/// left with `loaded == false`.
pub async fn fetch_all<T: AssetTransport>(
    transport: &T,
    descriptors: &mut [ResourceDescriptor],
    blobs: &BlobStore,
    progress: &mut ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<FetchReport> {
    sort_by_priority(descriptors);
    progress.begin_fetch(descriptors.len());

    let mut report = FetchReport::default();

    for descriptor in descriptors.iter_mut() {
        cancel.check()?;

        match fetch_one(transport, descriptor, progress, cancel).await {
            Ok(bytes) => {
                report.bytes += bytes.len() as u64;
                report.loaded += 1;
                descriptor.payload = Some(blobs.add(&descriptor.uri, bytes));
                descriptor.loaded = true;
                log::debug!("Fetched {}", descriptor.uri);
            }
            Err(VisionError::Cancelled) => return Err(VisionError::Cancelled),
            Err(e) if descriptor.required => {
                log::error!("Required resource {} failed: {e}", descriptor.uri);
                return Err(if e.is_not_found() {
                    VisionError::RequiredResourceMissing {
                        uri: descriptor.uri.clone(),
                    }
                } else {
                    VisionError::RequiredFetchFailed {
                        uri: descriptor.uri.clone(),
                        source: Box::new(e),
                    }
                });
            }
            Err(e) => {
                log::warn!("Skipping optional resource {}: {e}", descriptor.uri);
                descriptor.loaded = false;
                descriptor.payload = None;
                report.skipped.push(descriptor.uri.clone());
            }
        }

        progress.finish_resource();
    }

    log::info!(
        "Fetched {}/{} resources ({} bytes)",
        report.loaded,
        descriptors.len(),
        report.bytes
    );
    Ok(report)
}

async fn fetch_one<T: AssetTransport>(
    transport: &T,
    descriptor: &ResourceDescriptor,
    progress: &mut ProgressTracker<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let mut stream = transport.open(&descriptor.uri).await?;
    progress.begin_resource(descriptor.file_name(), stream.total());

    let mut body = Vec::with_capacity(preallocation_hint(stream.total()));
    while let Some(chunk) = stream.next_chunk().await {
        let chunk = chunk?;
        progress.advance_bytes(chunk.len() as u64);
        body.extend_from_slice(&chunk);
        cancel.check()?;
    }
    Ok(body)
}
