use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;

use common::blob::{BlobError, ShareAddress};

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// Share address printed by `blobdrop store`
    pub address: ShareAddress,

    /// Write the blob to this file instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Blob(#[from] BlobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Fetch {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        // The address names its own server; --remote is not consulted
        let bytes = ctx
            .blob_store()
            .fetch(&self.address, &CancellationToken::new())
            .await?;

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, &bytes).await?;
                Ok(format!("Wrote {} bytes to {}", bytes.len(), path.display()))
            }
            None => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}
