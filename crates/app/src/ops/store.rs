use std::path::PathBuf;

use clap::Args;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use common::blob::{BlobError, FileSource, FlowIdentity, ProgressReporter, ShareAddress};
use common::rendezvous::RendezvousQueue;

use super::identity::{load_identity, IdentityOpError};

#[derive(Args, Debug, Clone)]
pub struct Store {
    /// Files to store; each is uploaded by its own flow
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Upload as this locked identity instead of a fresh key per file
    #[arg(long, requires = "passphrase")]
    pub identity: Option<PathBuf>,

    /// Passphrase for --identity
    #[arg(long, env = "BLOBDROP_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to load identity: {0}")]
    Identity(#[from] IdentityOpError),

    #[error("interrupted before all uploads finished")]
    Interrupted,

    #[error("{failed} of {total} uploads failed:\n{report}")]
    Failed {
        failed: usize,
        total: usize,
        report: String,
    },
}

/// Why a single file did not produce an address
#[derive(Debug, thiserror::Error)]
pub enum FlowFailure {
    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("upload task failed: {0}")]
    Task(#[from] JoinError),
}

type Outcome = (usize, PathBuf, Result<ShareAddress, FlowFailure>);

/// Enqueue the outcome of `flow` once it ends, even if the task panicked
fn report_when_done(
    index: usize,
    path: PathBuf,
    flow: JoinHandle<Result<ShareAddress, BlobError>>,
    outcomes: RendezvousQueue<Outcome>,
) {
    tokio::spawn(async move {
        let result = match flow.await {
            Ok(result) => result.map_err(FlowFailure::from),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "upload task died");
                Err(FlowFailure::from(e))
            }
        };
        outcomes.enqueue((index, path, result));
    });
}

/// Wait for `count` outcomes and return them in submission order
async fn collect_outcomes(outcomes: &RendezvousQueue<Outcome>, count: usize) -> Vec<Outcome> {
    let never = CancellationToken::new();
    let mut finished = Vec::with_capacity(count);
    while finished.len() < count {
        match outcomes.dequeue(&never).await {
            Ok(outcome) => finished.push(outcome),
            Err(_) => break,
        }
    }
    finished.sort_by_key(|(index, _, _)| *index);
    finished
}

#[async_trait::async_trait]
impl crate::op::Op for Store {
    type Error = StoreError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut store = ctx.blob_store();
        if let (Some(path), Some(passphrase)) = (&self.identity, &self.passphrase) {
            let pair = load_identity(path, passphrase)?;
            store = store.with_identity(FlowIdentity::new(pair, passphrase.clone()));
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupted, cancelling uploads");
                    cancel.cancel();
                }
            })
        };

        let outcomes: RendezvousQueue<Outcome> = RendezvousQueue::new();
        for (index, path) in self.files.iter().enumerate() {
            let store = store.clone();
            let cancel = cancel.child_token();
            let source = FileSource::new(path);
            let flow = tokio::spawn(async move {
                store
                    .share(source, ProgressReporter::silent(), cancel)
                    .await
            });
            report_when_done(index, path.clone(), flow, outcomes.clone());
        }

        // Every flow reports back, cancelled or not
        let finished = collect_outcomes(&outcomes, self.files.len()).await;
        interrupt.abort();

        if cancel.is_cancelled() {
            return Err(StoreError::Interrupted);
        }

        let total = finished.len();
        let mut failed = 0;
        let lines: Vec<String> = finished
            .into_iter()
            .map(|(_, path, result)| match result {
                Ok(address) => format!("{}\t{}", path.display(), address),
                Err(e) => {
                    failed += 1;
                    format!("{}\terror: {}", path.display(), e)
                }
            })
            .collect();

        if failed > 0 {
            return Err(StoreError::Failed {
                failed,
                total,
                report: lines.join("\n"),
            });
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod test {
    use url::Url;

    use super::*;
    use crate::op::{Op, OpContext};
    use crate::ops::Fetch;
    use common::blob::{BlobHash, BlobSecret, BlobStoreDetails};

    async fn local_server() -> (OpContext, server::ShutdownHandle) {
        let config = server::Config::new("127.0.0.1:0".parse().unwrap()).unwrap();
        let (_, handle) = server::start_service(config).await.unwrap();
        let url = Url::parse(&format!("http://{}", handle.local_addr())).unwrap();
        (OpContext::new(url, None).unwrap(), handle)
    }

    #[tokio::test]
    async fn test_store_then_fetch() {
        let (ctx, handle) = local_server().await;
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&first, "first file").unwrap();
        std::fs::write(&second, "second file").unwrap();

        let op = Store {
            files: vec![first.clone(), second.clone()],
            identity: None,
            passphrase: None,
        };
        let output = op.execute(&ctx).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&first.display().to_string()));
        assert!(lines[1].starts_with(&second.display().to_string()));

        let address: ShareAddress = lines[1].split('\t').nth(1).unwrap().parse().unwrap();
        let fetched = Fetch {
            address: address.clone(),
            output: None,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(fetched, "second file");

        let out = dir.path().join("copy.txt");
        Fetch {
            address,
            output: Some(out.clone()),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "second file");

        handle.shutdown();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_reports_failure() {
        let (ctx, handle) = local_server().await;
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.txt");
        std::fs::write(&present, "here").unwrap();

        let op = Store {
            files: vec![dir.path().join("absent.txt"), present],
            identity: None,
            passphrase: None,
        };
        match op.execute(&ctx).await {
            Err(StoreError::Failed { failed, total, report }) => {
                assert_eq!((failed, total), (1, 2));
                assert!(report.lines().next().unwrap().contains("error:"));
                assert!(report.lines().nth(1).unwrap().contains("/blob/"));
            }
            other => panic!("expected partial failure, got {other:?}"),
        }

        handle.shutdown();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_store_with_saved_identity() {
        let (ctx, handle) = local_server().await;
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("me.pem");
        let pair = common::crypto::KeyPair::generate("pw").unwrap();
        std::fs::write(&key, pair.locked().to_pem()).unwrap();
        let file = dir.path().join("blob.bin");
        std::fs::write(&file, [1u8, 2, 3]).unwrap();

        let wrong = Store {
            files: vec![file.clone()],
            identity: Some(key.clone()),
            passphrase: Some("nope".to_string()),
        };
        assert!(matches!(
            wrong.execute(&ctx).await,
            Err(StoreError::Identity(_))
        ));

        let op = Store {
            files: vec![file],
            identity: Some(key),
            passphrase: Some("pw".to_string()),
        };
        op.execute(&ctx).await.unwrap();

        handle.shutdown();
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_panicked_flow_still_reports() {
        let outcomes: RendezvousQueue<Outcome> = RendezvousQueue::new();
        let base = Url::parse("http://localhost:3000").unwrap();
        let details = BlobStoreDetails::new(BlobHash::of(b"ok"), BlobSecret::from_bytes([1; 32]));
        let address = ShareAddress::new(&base, details).unwrap();

        let crash = true;
        let crashed = tokio::spawn(async move {
            if crash {
                panic!("flow crashed");
            }
            Err(BlobError::Cancelled)
        });
        let fine = tokio::spawn(async move { Ok::<_, BlobError>(address) });
        report_when_done(0, PathBuf::from("crashed.bin"), crashed, outcomes.clone());
        report_when_done(1, PathBuf::from("fine.bin"), fine, outcomes.clone());

        let finished = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            collect_outcomes(&outcomes, 2),
        )
        .await
        .unwrap();

        assert_eq!(finished.len(), 2);
        assert!(matches!(finished[0].2, Err(FlowFailure::Task(_))));
        assert_eq!(finished[1].1, PathBuf::from("fine.bin"));
        assert!(finished[1].2.is_ok());
    }
}
