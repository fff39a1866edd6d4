use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Body;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::address::ShareAddress;
use super::details::{BlobHash, BlobSecret, BlobStoreDetails};
use super::error::BlobError;
use super::progress::ProgressReporter;
use super::source::{BlobSource, ByteStream};
use super::store::{until_cancelled, BlobStore};
use crate::api::{ApiClient, FetchBlobRequest, PublishKeyRequest, StoreBlobRequest};
use crate::crypto::{KeyPair, PeerId};

/// Length in bytes of the random passphrase locking an ephemeral identity
const EPHEMERAL_PASSPHRASE_SIZE: usize = 32;

/// Where a [`StoreFlow`] is in the upload protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFlowState {
    Init,
    KeyPublished,
    Uploading,
    AwaitingCoordinates,
    Done,
    Failed,
}

impl fmt::Display for StoreFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreFlowState::Init => "init",
            StoreFlowState::KeyPublished => "key_published",
            StoreFlowState::Uploading => "uploading",
            StoreFlowState::AwaitingCoordinates => "awaiting_coordinates",
            StoreFlowState::Done => "done",
            StoreFlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Key pair plus the passphrase that unlocks it
#[derive(Clone)]
pub struct FlowIdentity {
    pair: KeyPair,
    passphrase: String,
}

impl fmt::Debug for FlowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowIdentity")
            .field("peer_id", &self.pair.peer_id())
            .finish_non_exhaustive()
    }
}

impl FlowIdentity {
    pub fn new(pair: KeyPair, passphrase: impl Into<String>) -> Self {
        Self {
            pair,
            passphrase: passphrase.into(),
        }
    }

    /// A throwaway identity locked under a random passphrase
    pub fn ephemeral() -> Result<Self, BlobError> {
        let mut raw = [0u8; EPHEMERAL_PASSPHRASE_SIZE];
        getrandom::getrandom(&mut raw).map_err(|e| {
            BlobError::Identity(anyhow::anyhow!("randomness unavailable: {e}").into())
        })?;
        let passphrase = hex::encode(raw);
        let pair = KeyPair::generate(&passphrase)?;
        Ok(Self::new(pair, passphrase))
    }

    pub fn pair(&self) -> &KeyPair {
        &self.pair
    }

    pub fn peer_id(&self) -> PeerId {
        self.pair.peer_id()
    }
}

/// One run of the upload protocol against a bootstrap server
///
/// `Init -> KeyPublished -> Uploading -> AwaitingCoordinates -> Done`, with any
/// failure or cancellation landing in `Failed`. Steps are strictly sequential
/// and nothing is retried.
pub struct StoreFlow<'a> {
    api: &'a ApiClient,
    identity: Option<FlowIdentity>,
    progress: ProgressReporter,
    cancel: CancellationToken,
    state: StoreFlowState,
}

impl<'a> StoreFlow<'a> {
    /// Without an identity the flow generates an ephemeral one when it starts
    pub fn new(
        api: &'a ApiClient,
        identity: Option<FlowIdentity>,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            identity,
            progress,
            cancel,
            state: StoreFlowState::Init,
        }
    }

    pub fn state(&self) -> StoreFlowState {
        self.state
    }

    /// Peer the flow uploads as, once it has an identity
    pub fn peer_id(&self) -> Option<PeerId> {
        self.identity.as_ref().map(FlowIdentity::peer_id)
    }

    pub async fn run<S>(&mut self, source: S) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<ByteStream>,
    {
        let result = self.drive(source).await;
        match &result {
            Ok(details) => {
                self.transition(StoreFlowState::Done);
                tracing::info!(blob_hash = %details.blob_hash, "blob stored");
            }
            Err(err) if err.is_cancelled() => {
                self.transition(StoreFlowState::Failed);
                tracing::info!("store flow cancelled");
            }
            Err(err) => {
                self.transition(StoreFlowState::Failed);
                tracing::warn!(error = %err, "store flow failed");
            }
        }
        result
    }

    async fn drive<S>(&mut self, source: S) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<ByteStream>,
    {
        let identity = match self.identity.clone() {
            Some(identity) => identity,
            None => {
                let identity = FlowIdentity::ephemeral()?;
                self.identity = Some(identity.clone());
                identity
            }
        };

        self.publish_key(&identity).await?;
        let armored = self.upload(&identity, source).await?;
        self.open_coordinates(&identity, &armored)
    }

    async fn publish_key(&mut self, identity: &FlowIdentity) -> Result<(), BlobError> {
        let request = PublishKeyRequest {
            public_key: *identity.pair.public(),
        };
        until_cancelled(&self.cancel, self.api.call(request)).await??;
        self.transition(StoreFlowState::KeyPublished);
        Ok(())
    }

    async fn upload<S>(&mut self, identity: &FlowIdentity, source: S) -> Result<String, BlobError>
    where
        S: BlobSource<ByteStream>,
    {
        self.transition(StoreFlowState::Uploading);

        let stream = source.open(&self.progress, &self.cancel).await?;
        let len = stream.known_len();
        let request = StoreBlobRequest {
            peer_id: identity.peer_id(),
            body: Body::wrap_stream(stream.with_progress(self.progress.clone())),
            len,
        };

        // Dropping the request future on cancel aborts the body mid-stream
        let armored = until_cancelled(&self.cancel, self.api.call(request)).await??;
        self.transition(StoreFlowState::AwaitingCoordinates);
        Ok(armored)
    }

    fn open_coordinates(
        &self,
        identity: &FlowIdentity,
        armored: &str,
    ) -> Result<BlobStoreDetails, BlobError> {
        let plaintext = identity
            .pair
            .decrypt(&identity.passphrase, armored.trim())?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| BlobError::Protocol(format!("undecodable blob coordinates: {e}")))
    }

    fn transition(&mut self, next: StoreFlowState) {
        tracing::debug!(
            peer_id = ?self.peer_id(),
            from = %self.state,
            to = %next,
            "store flow transition"
        );
        self.state = next;
    }
}

/// [`BlobStore`] backed by a bootstrap server
#[derive(Debug, Clone)]
pub struct RemoteBlobStore {
    api: ApiClient,
    identity: Option<FlowIdentity>,
}

impl RemoteBlobStore {
    pub fn new(remote: &Url) -> Result<Self, BlobError> {
        Ok(Self {
            api: ApiClient::new(remote)?,
            identity: None,
        })
    }

    /// Share an existing client's connection pool
    pub fn from_client(api: ApiClient) -> Self {
        Self {
            api,
            identity: None,
        }
    }

    /// Upload as `identity` instead of a fresh identity per store
    pub fn with_identity(mut self, identity: FlowIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn base_url(&self) -> &Url {
        self.api.base_url()
    }

    /// A flow ready to run against this store's server
    pub fn flow(&self, progress: ProgressReporter, cancel: CancellationToken) -> StoreFlow<'_> {
        StoreFlow::new(&self.api, self.identity.clone(), progress, cancel)
    }

    /// Store `source` and return an address anyone can fetch it from
    pub async fn share<S>(
        &self,
        source: S,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<ShareAddress, BlobError>
    where
        S: BlobSource<ByteStream> + 'static,
    {
        let details = self.store_with(source, progress, cancel).await?;
        Ok(ShareAddress::new(self.base_url(), details)?)
    }

    /// Download the blob behind a share address, from whichever server it names
    pub async fn fetch(
        &self,
        address: &ShareAddress,
        cancel: &CancellationToken,
    ) -> Result<Bytes, BlobError> {
        self.fetch_with(address, &ProgressReporter::silent(), cancel)
            .await
    }

    /// [`Self::fetch`], counting received bytes against `progress`
    ///
    /// The reporter restarts at zero once the response headers arrive, so one
    /// reporter can follow a store and then the matching download.
    pub async fn fetch_with(
        &self,
        address: &ShareAddress,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Bytes, BlobError> {
        let request = FetchBlobRequest {
            hash: *address.hash(),
            secret: address.secret().clone(),
        };
        let stream = until_cancelled(cancel, self.api.call_at(address.base(), request)).await??;
        let bytes = receive(stream, progress, cancel).await?;
        tracing::debug!(blob_hash = %address.hash(), len = bytes.len(), "fetched blob");
        Ok(bytes)
    }

    /// Download a blob from this store's server
    pub async fn fetch_blob(
        &self,
        hash: BlobHash,
        secret: BlobSecret,
        cancel: &CancellationToken,
    ) -> Result<Bytes, BlobError> {
        let request = FetchBlobRequest { hash, secret };
        let stream = until_cancelled(cancel, self.api.call(request)).await??;
        receive(stream, &ProgressReporter::silent(), cancel).await
    }
}

async fn receive(
    stream: ByteStream,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<Bytes, BlobError> {
    progress.reset(stream.known_len());
    let body = stream.with_progress(progress.clone()).collect_bytes();
    Ok(until_cancelled(cancel, body).await??)
}

#[async_trait]
impl BlobStore<ByteStream> for RemoteBlobStore {
    async fn store_with<S>(
        &self,
        source: S,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<BlobStoreDetails, BlobError>
    where
        S: BlobSource<ByteStream> + 'static,
    {
        let mut flow = self.flow(progress, cancel);
        flow.run(source).await
    }
}
