use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::details::BlobStoreDetails;
use super::error::BlobError;
use super::progress::ProgressReporter;
use super::source::BlobSource;

/// Somewhere blobs can be put, handing back their retrieval coordinates
///
/// A store consumes the source it is given and does not keep it once the
/// call returns, successful or not.
#[async_trait]
pub trait BlobStore<T: Send + 'static>: Send + Sync {
    async fn store_with<S>(
        &self,
        source: S,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<T> + 'static;

    /// Store with nobody watching progress and no way to cancel
    async fn store<S>(&self, source: S) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<T> + 'static,
    {
        self.store_with(source, ProgressReporter::silent(), CancellationToken::new())
            .await
    }
}

/// Race `fut` against `cancel`. Cancellation wins ties.
pub async fn until_cancelled<F>(cancel: &CancellationToken, fut: F) -> Result<F::Output, BlobError>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BlobError::Cancelled),
        output = fut => Ok(output),
    }
}
