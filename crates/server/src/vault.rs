use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use subtle::{Choice, ConstantTimeEq};
use tokio_util::sync::CancellationToken;

use common::blob::{
    until_cancelled, BlobError, BlobHash, BlobSecret, BlobSource, BlobStore, BlobStoreDetails,
    ByteStream, DetailsError, ProgressReporter,
};

#[derive(Debug)]
struct StoredBlob {
    bytes: Bytes,
    /// One per store call; any of them unlocks the blob
    secrets: Vec<BlobSecret>,
}

/// In-memory, content-addressed blob storage with secret-gated reads
///
/// Identical content is stored once. Every `put` still mints a fresh secret,
/// and all secrets ever issued for a hash stay valid.
#[derive(Debug, Default)]
pub struct BlobVault {
    blobs: RwLock<HashMap<BlobHash, StoredBlob>>,
}

impl BlobVault {
    pub fn put(&self, bytes: Bytes) -> Result<BlobStoreDetails, DetailsError> {
        let hash = BlobHash::of(&bytes);
        let secret = BlobSecret::generate()?;

        let mut blobs = self.blobs.write();
        let entry = blobs.entry(hash).or_insert_with(|| StoredBlob {
            bytes,
            secrets: Vec::new(),
        });
        entry.secrets.push(secret.clone());
        tracing::debug!(
            blob_hash = %hash,
            len = entry.bytes.len(),
            secrets = entry.secrets.len(),
            "stored blob"
        );

        Ok(BlobStoreDetails::new(hash, secret))
    }

    /// The blob's bytes, if `secret` was issued for `hash`
    ///
    /// Every recorded secret is compared in constant time, so timing reveals
    /// neither which secret matched nor how much of a guess was right.
    pub fn get(&self, hash: &BlobHash, secret: &BlobSecret) -> Option<Bytes> {
        let blobs = self.blobs.read();
        let stored = blobs.get(hash)?;

        let matched = stored
            .secrets
            .iter()
            .fold(Choice::from(0), |acc, issued| {
                acc | issued.as_bytes()[..].ct_eq(&secret.as_bytes()[..])
            });

        bool::from(matched).then(|| stored.bytes.clone())
    }

    pub fn contains(&self, hash: &BlobHash) -> bool {
        self.blobs.read().contains_key(hash)
    }

    /// Number of distinct blobs held
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

/// Store locally without going through HTTP
#[async_trait]
impl BlobStore<ByteStream> for BlobVault {
    async fn store_with<S>(
        &self,
        source: S,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<ByteStream> + 'static,
    {
        let stream = source.open(&progress, &cancel).await?;
        let collect = stream.with_progress(progress.clone()).collect_bytes();
        let bytes = until_cancelled(&cancel, collect).await??;
        Ok(self.put(bytes)?)
    }
}

#[cfg(test)]
mod test {
    use common::blob::BytesSource;

    use super::*;

    #[test]
    fn test_put_and_get() {
        let vault = BlobVault::default();
        let details = vault.put(Bytes::from_static(b"hello")).unwrap();

        assert_eq!(details.blob_hash, BlobHash::of(b"hello"));
        assert_eq!(
            vault.get(&details.blob_hash, &details.secret).unwrap().as_ref(),
            b"hello"
        );
    }

    #[test]
    fn test_wrong_secret_or_hash() {
        let vault = BlobVault::default();
        let details = vault.put(Bytes::from_static(b"hello")).unwrap();

        let wrong = BlobSecret::generate().unwrap();
        assert!(vault.get(&details.blob_hash, &wrong).is_none());
        assert!(vault.get(&BlobHash::of(b"other"), &details.secret).is_none());
    }

    #[test]
    fn test_secret_does_not_cross_blobs() {
        let vault = BlobVault::default();
        let a = vault.put(Bytes::from_static(b"a")).unwrap();
        let b = vault.put(Bytes::from_static(b"b")).unwrap();
        assert!(vault.get(&a.blob_hash, &b.secret).is_none());
        assert!(vault.get(&b.blob_hash, &a.secret).is_none());
    }

    #[test]
    fn test_duplicate_content_gets_independent_secrets() {
        let vault = BlobVault::default();
        let first = vault.put(Bytes::from_static(b"same")).unwrap();
        let second = vault.put(Bytes::from_static(b"same")).unwrap();

        assert_eq!(first.blob_hash, second.blob_hash);
        assert_ne!(first.secret, second.secret);
        assert_eq!(vault.len(), 1);
        assert!(vault.get(&first.blob_hash, &first.secret).is_some());
        assert!(vault.get(&second.blob_hash, &second.secret).is_some());
    }

    #[tokio::test]
    async fn test_vault_as_blob_store() {
        let vault = BlobVault::default();
        let (progress, rx) = ProgressReporter::new();
        let details = vault
            .store_with(
                BytesSource::new("local bytes"),
                progress,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(vault.contains(&details.blob_hash));
        assert_eq!(rx.borrow().transferred, 11);
        assert_eq!(rx.borrow().total, Some(11));
    }

    #[tokio::test]
    async fn test_cancelled_store_keeps_nothing() {
        let vault = BlobVault::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stream = ByteStream::new(futures::stream::pending::<std::io::Result<Bytes>>(), None);
        let result = vault
            .store_with(stream, ProgressReporter::silent(), cancel)
            .await;

        assert!(matches!(result, Err(BlobError::Cancelled)));
        assert!(vault.is_empty());
    }
}
