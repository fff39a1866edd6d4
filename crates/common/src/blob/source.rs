use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use super::error::BlobError;
use super::progress::ProgressReporter;
use super::store::until_cancelled;
use crate::api::{ApiError, FromResponse};

/// Read size for file sources and in-memory chunking
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Something that can produce one `T` on demand, e.g. the bytes of a blob
///
/// Sources are consumed by value, so a store operation opens each source at
/// most once and cannot hold on to it afterwards.
#[async_trait]
pub trait BlobSource<T>: Send {
    /// Materialize the value. Sources that learn their size report it through
    /// `progress`; slow sources stop early when `cancel` fires.
    async fn open(
        self,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<T, BlobError>
    where
        Self: Sized;
}

/// A stream of blob bytes with an optional known length
pub struct ByteStream {
    inner: BoxStream<'static, io::Result<Bytes>>,
    len: Option<u64>,
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").field("len", &self.len).finish()
    }
}

impl ByteStream {
    pub fn new<S>(stream: S, len: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            len,
        }
    }

    /// Serve an in-memory buffer in [`CHUNK_SIZE`] pieces
    pub fn from_bytes(bytes: Bytes) -> Self {
        let len = bytes.len() as u64;
        let chunks: Vec<io::Result<Bytes>> = (0..bytes.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(bytes.slice(start..bytes.len().min(start + CHUNK_SIZE))))
            .collect();
        Self::new(stream::iter(chunks), Some(len))
    }

    /// Total size in bytes, if known before reading
    pub fn known_len(&self) -> Option<u64> {
        self.len
    }

    /// Count every chunk that passes through against `progress`
    pub fn with_progress(self, progress: ProgressReporter) -> Self {
        let len = self.len;
        let inner = self.inner.inspect_ok(move |chunk| progress.advance(chunk.len() as u64));
        Self::new(inner, len)
    }

    /// Read the whole stream into memory
    pub async fn collect_bytes(self) -> io::Result<Bytes> {
        let capacity = self.len.unwrap_or(0).min(CHUNK_SIZE as u64 * 16) as usize;
        let buf = self
            .inner
            .try_fold(BytesMut::with_capacity(capacity), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok::<_, io::Error>(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

impl Stream for ByteStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A response body, read as it arrives
#[async_trait]
impl FromResponse for ByteStream {
    async fn from_response(response: reqwest::Response) -> Result<Self, ApiError> {
        let len = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        Ok(Self::new(body, len))
    }
}

/// An already-open stream is its own source
#[async_trait]
impl BlobSource<ByteStream> for ByteStream {
    async fn open(
        self,
        progress: &ProgressReporter,
        _cancel: &CancellationToken,
    ) -> Result<ByteStream, BlobError> {
        progress.set_total(self.len);
        Ok(self)
    }
}

/// Blob bytes held in memory
#[derive(Debug, Clone)]
pub struct BytesSource(Bytes);

impl BytesSource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }
}

#[async_trait]
impl BlobSource<ByteStream> for BytesSource {
    async fn open(
        self,
        progress: &ProgressReporter,
        _cancel: &CancellationToken,
    ) -> Result<ByteStream, BlobError> {
        progress.set_total(Some(self.0.len() as u64));
        Ok(ByteStream::from_bytes(self.0))
    }
}

/// A file on the local filesystem, streamed in [`CHUNK_SIZE`] reads
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlobSource<ByteStream> for FileSource {
    async fn open(
        self,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, BlobError> {
        let file = until_cancelled(cancel, tokio::fs::File::open(&self.path)).await??;
        let len = until_cancelled(cancel, file.metadata()).await??.len();
        tracing::debug!(path = %self.path.display(), len, "opened file source");

        progress.set_total(Some(len));
        Ok(ByteStream::new(
            ReaderStream::with_capacity(file, CHUNK_SIZE),
            Some(len),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_bytes_source_chunks() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];
        let progress = ProgressReporter::silent();
        let stream = BytesSource::new(data.clone())
            .open(&progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stream.known_len(), Some(data.len() as u64));
        assert_eq!(progress.current().total, Some(data.len() as u64));

        let chunks: Vec<_> = stream.try_collect::<Vec<Bytes>>().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 10);
    }

    #[tokio::test]
    async fn test_empty_bytes_source() {
        let stream = ByteStream::from_bytes(Bytes::new());
        assert_eq!(stream.known_len(), Some(0));
        assert!(stream.collect_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_counts_chunks() {
        let data = vec![1u8; CHUNK_SIZE + 1];
        let progress = ProgressReporter::silent();
        let stream =
            ByteStream::from_bytes(Bytes::from(data.clone())).with_progress(progress.clone());
        let collected = stream.collect_bytes().await.unwrap();

        assert_eq!(collected.as_ref(), data.as_slice());
        assert_eq!(progress.current().transferred, data.len() as u64);
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, b"file contents").await.unwrap();

        let progress = ProgressReporter::silent();
        let stream = FileSource::new(&path)
            .open(&progress, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(progress.current().total, Some(13));
        assert_eq!(stream.collect_bytes().await.unwrap().as_ref(), b"file contents");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::new(dir.path().join("nope"))
            .open(&ProgressReporter::silent(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(BlobError::Io(_))));
    }

    #[tokio::test]
    async fn test_cancelled_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        tokio::fs::write(&path, b"x").await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = FileSource::new(&path)
            .open(&ProgressReporter::silent(), &cancel)
            .await;
        assert!(matches!(result, Err(BlobError::Cancelled)));
    }
}
