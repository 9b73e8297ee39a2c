//! Asset acquisition
//!
//! - [`io`]: transports (file, HTTP, in-memory) yielding chunked byte streams
//! - [`descriptor`]: what a run fetches and what it ended up loading
//! - [`discovery`]: naming-convention probing for a model's resources
//! - [`fetch`]: the sequential, cancellable fetch stage
//! - [`storage`]: run-scoped registry of fetched payloads

pub mod descriptor;
pub mod discovery;
pub mod fetch;
pub mod io;
pub mod storage;

pub use descriptor::{LoadManifest, ManifestEntry, ResourceDescriptor, ResourceRole};
pub use discovery::{discover, verify_required};
pub use fetch::{FetchReport, fetch_all};
#[cfg(feature = "http")]
pub use io::HttpTransport;
pub use io::{AssetTransport, ByteStream, FileTransport, MemoryTransport, TransportVariant};
pub use storage::{Blob, BlobHandle, BlobStore};
