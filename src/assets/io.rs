use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream, Stream};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::io::AsyncReadExt;

use crate::errors::{Result, VisionError};

/// Default read size for chunked transports.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound on the buffer reserved up front from a reported body size.
/// Bodies larger than this still load; the buffer grows as chunks arrive.
pub const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Initial buffer capacity for a body of reported size `total`.
///
/// The size comes from the transport (for HTTP, the server's
/// `Content-Length`) and is only a hint.
#[must_use]
pub fn preallocation_hint(total: Option<u64>) -> usize {
    total.map_or(0, |t| {
        usize::try_from(t).map_or(MAX_PREALLOCATION, |t| t.min(MAX_PREALLOCATION))
    })
}

/// A resource body delivered chunk by chunk, so progress is observable
/// mid-download.
pub struct ByteStream {
    total: Option<u64>,
    chunks: BoxStream<'static, Result<Vec<u8>>>,
}

impl ByteStream {
    pub fn new(
        total: Option<u64>,
        chunks: impl Stream<Item = Result<Vec<u8>>> + Send + 'static,
    ) -> Self {
        Self {
            total,
            chunks: chunks.boxed(),
        }
    }

    /// Splits an in-memory body into `chunk_size` pieces.
    #[must_use]
    pub fn from_bytes(bytes: &[u8], chunk_size: usize) -> Self {
        let chunks: Vec<Result<Vec<u8>>> = bytes
            .chunks(chunk_size.max(1))
            .map(|c| Ok(c.to_vec()))
            .collect();
        Self::new(Some(bytes.len() as u64), stream::iter(chunks))
    }

    /// Total size in bytes, when the transport knows it up front.
    #[inline]
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>>> {
        self.chunks.next().await
    }

    /// Drains the stream into a single buffer.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(preallocation_hint(self.total));
        while let Some(chunk) = self.next_chunk().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

/// Resource transport.
/// Supports existence probing and chunked asynchronous reads.
pub trait AssetTransport: Send + Sync {
    /// Lightweight existence check (HEAD request, file metadata).
    fn probe(&self, uri: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Opens the resource for chunked reading.
    fn open(&self, uri: &str) -> impl Future<Output = Result<ByteStream>> + Send;

    /// The absolute location a relative URI resolves to on this transport.
    fn resolve_url(&self, uri: &str) -> String;
}

/// Returns the file-name part of a path or URL, without query or fragment.
#[must_use]
pub fn file_name(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let path = &uri[..end];
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// ============================================================================
// Local files
// ============================================================================

/// Local file transport, used when the viewer runs embedded.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root_path: PathBuf,
    chunk_size: usize,
}

impl FileTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self {
            root_path,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[inline]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn path_for(&self, uri: &str) -> PathBuf {
        self.root_path.join(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

impl AssetTransport for FileTransport {
    async fn probe(&self, uri: &str) -> Result<bool> {
        match tokio::fs::metadata(self.path_for(uri)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, uri: &str) -> Result<ByteStream> {
        let file = tokio::fs::File::open(self.path_for(uri)).await?;
        let total = file.metadata().await?.len();
        let chunk_size = self.chunk_size;

        let chunks = stream::try_unfold(file, move |mut file| async move {
            let mut buf = vec![0u8; chunk_size];
            let next: Result<Option<(Vec<u8>, tokio::fs::File)>> = match file.read(&mut buf).await {
                Ok(0) => Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    Ok(Some((buf, file)))
                }
                Err(e) => Err(e.into()),
            };
            next
        });

        Ok(ByteStream::new(Some(total), chunks))
    }

    fn resolve_url(&self, uri: &str) -> String {
        self.path_for(uri).display().to_string()
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP(S) transport (conditional compilation).
#[cfg(feature = "http")]
pub struct HttpTransport {
    root_url: url::Url,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpTransport {
    pub fn new(url_str: &str) -> Result<Self> {
        let mut root_url = url::Url::parse(url_str)?;
        // The root names a directory: relative joins must not drop its last segment.
        if !root_url.path().ends_with('/')
            && let Ok(mut segments) = root_url.path_segments_mut()
        {
            segments.push("");
        }

        Ok(Self {
            root_url,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
        })
    }

    #[inline]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }

    fn url_for(&self, uri: &str) -> Result<url::Url> {
        Ok(self.root_url.join(uri)?)
    }
}

#[cfg(feature = "http")]
impl AssetTransport for HttpTransport {
    async fn probe(&self, uri: &str) -> Result<bool> {
        let url = self.url_for(uri)?;
        let resp = self.client.head(url.clone()).send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(true);
        }
        match status {
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::GONE => Ok(false),
            // Some CDNs refuse HEAD; ask for a single byte instead.
            reqwest::StatusCode::METHOD_NOT_ALLOWED => {
                let resp = self
                    .client
                    .get(url)
                    .header(reqwest::header::RANGE, "bytes=0-0")
                    .send()
                    .await?;
                Ok(resp.status().is_success())
            }
            _ => Err(VisionError::HttpStatus {
                status: status.as_u16(),
                uri: uri.to_string(),
            }),
        }
    }

    async fn open(&self, uri: &str) -> Result<ByteStream> {
        let url = self.url_for(uri)?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(VisionError::HttpStatus {
                status: resp.status().as_u16(),
                uri: uri.to_string(),
            });
        }
        let total = resp.content_length();

        let chunks = stream::try_unfold(resp, |mut resp| async move {
            let next: Result<Option<(Vec<u8>, reqwest::Response)>> = match resp.chunk().await {
                Ok(Some(bytes)) => Ok(Some((bytes.to_vec(), resp))),
                Ok(None) => Ok(None),
                Err(e) => Err(e.into()),
            };
            next
        });

        Ok(ByteStream::new(total, chunks))
    }

    fn resolve_url(&self, uri: &str) -> String {
        self.url_for(uri)
            .map_or_else(|_| uri.to_string(), |u| u.to_string())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory transport.
///
/// Serves pre-registered bodies in fixed-size chunks and counts every probe
/// and fetch, which makes it the transport of choice for tests and dry runs.
pub struct MemoryTransport {
    entries: RwLock<FxHashMap<String, Arc<[u8]>>>,
    failing: RwLock<FxHashSet<String>>,
    probes: Mutex<FxHashMap<String, usize>>,
    fetches: Mutex<FxHashMap<String, usize>>,
    chunk_size: usize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::default(),
            failing: RwLock::default(),
            probes: Mutex::default(),
            fetches: Mutex::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn key(uri: &str) -> String {
        uri.trim_start_matches("./").to_string()
    }

    pub fn insert(&self, uri: &str, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        self.entries.write().insert(Self::key(uri), bytes.into());
    }

    pub fn remove(&self, uri: &str) {
        self.entries.write().remove(&Self::key(uri));
    }

    /// Makes `open` fail for a resource that still answers probes.
    pub fn fail_on_open(&self, uri: &str) {
        self.failing.write().insert(Self::key(uri));
    }

    #[must_use]
    pub fn probe_count(&self, uri: &str) -> usize {
        self.probes.lock().get(&Self::key(uri)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn fetch_count(&self, uri: &str) -> usize {
        self.fetches.lock().get(&Self::key(uri)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

impl AssetTransport for MemoryTransport {
    async fn probe(&self, uri: &str) -> Result<bool> {
        let key = Self::key(uri);
        *self.probes.lock().entry(key.clone()).or_default() += 1;
        Ok(self.entries.read().contains_key(&key))
    }

    async fn open(&self, uri: &str) -> Result<ByteStream> {
        let key = Self::key(uri);
        *self.fetches.lock().entry(key.clone()).or_default() += 1;

        if self.failing.read().contains(&key) {
            return Err(VisionError::HttpStatus {
                status: 500,
                uri: uri.to_string(),
            });
        }
        let body = self
            .entries
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| VisionError::NotFound(uri.to_string()))?;

        Ok(ByteStream::from_bytes(&body, self.chunk_size))
    }

    fn resolve_url(&self, uri: &str) -> String {
        format!("memory://{}", Self::key(uri))
    }
}

// ============================================================================
// Variant dispatch
// ============================================================================

/// Transport variant enum.
/// Picks the concrete transport from the configured root without trait objects.
#[derive(Clone)]
pub enum TransportVariant {
    File(Arc<FileTransport>),
    #[cfg(feature = "http")]
    Http(Arc<HttpTransport>),
}

impl TransportVariant {
    /// Creates the matching transport from a directory path or base URL.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            #[cfg(feature = "http")]
            {
                Ok(Self::Http(Arc::new(HttpTransport::new(source)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(VisionError::FeatureNotEnabled(
                    "HTTP transport requires `features = [\"http\"]`".to_string(),
                ))
            }
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            Ok(Self::File(Arc::new(FileTransport::new(path))))
        }
    }

    /// Sets the read size of file transports. HTTP bodies arrive in whatever
    /// chunks the server sends.
    #[must_use]
    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        match self {
            Self::File(t) => Self::File(Arc::new(
                Arc::unwrap_or_clone(t).with_chunk_size(chunk_size),
            )),
            #[cfg(feature = "http")]
            other @ Self::Http(_) => other,
        }
    }
}

impl AssetTransport for TransportVariant {
    async fn probe(&self, uri: &str) -> Result<bool> {
        match self {
            Self::File(t) => t.probe(uri).await,
            #[cfg(feature = "http")]
            Self::Http(t) => t.probe(uri).await,
        }
    }

    async fn open(&self, uri: &str) -> Result<ByteStream> {
        match self {
            Self::File(t) => t.open(uri).await,
            #[cfg(feature = "http")]
            Self::Http(t) => t.open(uri).await,
        }
    }

    fn resolve_url(&self, uri: &str) -> String {
        match self {
            Self::File(t) => t.resolve_url(uri),
            #[cfg(feature = "http")]
            Self::Http(t) => t.resolve_url(uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_directories_and_query() {
        assert_eq!(file_name("textures/wall_diffuse.png"), "wall_diffuse.png");
        assert_eq!(
            file_name("https://cdn.example.com/a/b/wall.png?v=3#x"),
            "wall.png"
        );
        assert_eq!(file_name("C:\\models\\House.glb"), "House.glb");
        assert_eq!(file_name("plain.glb"), "plain.glb");
    }

    #[test]
    fn memory_transport_chunks_bodies() {
        let transport = MemoryTransport::new().with_chunk_size(4);
        transport.insert("a.bin", vec![7u8; 10]);

        let stream = pollster::block_on(transport.open("a.bin")).unwrap();
        assert_eq!(stream.total(), Some(10));
        let body = pollster::block_on(stream.read_to_end()).unwrap();
        assert_eq!(body.len(), 10);
        assert_eq!(transport.fetch_count("a.bin"), 1);
    }

    #[test]
    fn reported_size_only_hints_the_buffer() {
        assert_eq!(preallocation_hint(None), 0);
        assert_eq!(preallocation_hint(Some(300)), 300);
        assert_eq!(preallocation_hint(Some(u64::MAX)), MAX_PREALLOCATION);

        let stream = ByteStream::new(Some(u64::MAX), stream::iter(vec![Ok(vec![1u8, 2, 3])]));
        let body = pollster::block_on(stream.read_to_end()).unwrap();
        assert_eq!(body, [1, 2, 3]);
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_root_gains_trailing_slash() {
        let transport = HttpTransport::new("https://cdn.example.com/models").unwrap();
        assert_eq!(transport.root_url().as_str(), "https://cdn.example.com/models/");
        assert_eq!(
            transport.resolve_url("House.glb"),
            "https://cdn.example.com/models/House.glb"
        );
    }
}
