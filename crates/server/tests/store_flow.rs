mod common;

use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use ::common::blob::{
    BlobError, BlobHash, BlobStore, ByteStream, BytesSource, FileSource, FlowIdentity,
    ProgressReporter, RemoteBlobStore, ShareAddress, StoreFlowState,
};
use ::common::crypto::KeyPair;
use ::common::rendezvous::RendezvousQueue;

#[tokio::test]
async fn test_hello_end_to_end() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let address = store
        .share(
            BytesSource::new("hello"),
            ProgressReporter::silent(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        address.hash().to_hex(),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    let expected_prefix = format!(
        "{}blob/{}?psk=",
        server.url,
        address.hash().to_hex()
    );
    assert!(address.to_string().starts_with(&expected_prefix));

    // the address alone is enough, from a fresh client
    let parsed: ShareAddress = address.to_string().parse().unwrap();
    let reader = RemoteBlobStore::new(&server.url).unwrap();
    let bytes = reader
        .fetch(&parsed, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), b"hello");

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_secret_is_not_retrievable() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let details = store.store(BytesSource::new("hello")).await.unwrap();
    let other = store.store(BytesSource::new("something else")).await.unwrap();

    let result = store
        .fetch_blob(details.blob_hash, other.secret, &CancellationToken::new())
        .await;
    match result {
        Err(BlobError::HttpStatus(status, _)) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected 404, got {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_duplicate_uploads_get_independent_secrets() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let first = store.store(BytesSource::new("same bytes")).await.unwrap();
    let second = store.store(BytesSource::new("same bytes")).await.unwrap();

    assert_eq!(first.blob_hash, second.blob_hash);
    assert_ne!(first.secret, second.secret);
    assert_eq!(server.state.blobs().len(), 1);

    let cancel = CancellationToken::new();
    for details in [first, second] {
        let bytes = store
            .fetch_blob(details.blob_hash, details.secret, &cancel)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"same bytes");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_flow_states_and_progress() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let data = vec![42u8; 300 * 1024];
    let (progress, rx) = ProgressReporter::new();
    let mut flow = store.flow(progress, CancellationToken::new());
    assert_eq!(flow.state(), StoreFlowState::Init);
    assert!(flow.peer_id().is_none());

    let details = flow.run(BytesSource::new(data.clone())).await.unwrap();

    assert_eq!(flow.state(), StoreFlowState::Done);
    assert_eq!(details.blob_hash, BlobHash::of(&data));
    let peer_id = flow.peer_id().unwrap();
    assert!(server.state.keys().get(&peer_id).is_some());

    let progress = *rx.borrow();
    assert_eq!(progress.total, Some(data.len() as u64));
    assert_eq!(progress.transferred, data.len() as u64);

    server.stop().await;
}

#[tokio::test]
async fn test_download_progress_restarts_after_upload() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let data = vec![7u8; 200 * 1024];
    let len = data.len() as u64;
    let (progress, rx) = ProgressReporter::new();
    let address = store
        .share(
            BytesSource::new(data.clone()),
            progress.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(rx.borrow().transferred, len);

    let bytes = store
        .fetch_with(&address, &progress, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), data.as_slice());
    assert_eq!(rx.borrow().transferred, len);
    assert_eq!(rx.borrow().total, Some(len));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        store.fetch_with(&address, &progress, &cancel).await,
        Err(BlobError::Cancelled)
    ));

    server.stop().await;
}

#[tokio::test]
async fn test_file_upload_with_shared_identity() {
    let server = common::spawn_server().await;
    let pair = KeyPair::generate("shared").unwrap();
    let identity = FlowIdentity::new(pair.clone(), "shared");
    let store = RemoteBlobStore::new(&server.url)
        .unwrap()
        .with_identity(identity);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    tokio::fs::write(&path, b"file body").await.unwrap();

    let details = store.store(FileSource::new(&path)).await.unwrap();
    let again = store.store(BytesSource::new("second")).await.unwrap();

    assert_eq!(server.state.keys().len(), 1);
    assert!(server.state.keys().get(&pair.peer_id()).is_some());
    assert_eq!(details.blob_hash, BlobHash::of(b"file body"));
    assert_ne!(details.blob_hash, again.blob_hash);

    server.stop().await;
}

#[tokio::test]
async fn test_wrong_passphrase_fails_decryption() {
    let server = common::spawn_server().await;
    let pair = KeyPair::generate("right").unwrap();
    let store = RemoteBlobStore::new(&server.url)
        .unwrap()
        .with_identity(FlowIdentity::new(pair, "wrong"));

    let mut flow = store.flow(ProgressReporter::silent(), CancellationToken::new());
    let result = flow.run(BytesSource::new("hello")).await;

    assert!(matches!(result, Err(BlobError::Decryption(_))));
    assert_eq!(flow.state(), StoreFlowState::Failed);
    // the upload itself went through; only the coordinates are unreadable
    assert_eq!(server.state.blobs().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_upload_over_limit_fails_flow() {
    let server = common::spawn_server_with(|config| config.max_upload_bytes(1024)).await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    let mut flow = store.flow(ProgressReporter::silent(), CancellationToken::new());
    let result = flow.run(BytesSource::new(vec![0u8; 64 * 1024])).await;

    assert!(result.is_err());
    assert_eq!(flow.state(), StoreFlowState::Failed);
    assert!(server.state.blobs().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_cancel_mid_upload() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();

    // One chunk, then a stream that never finishes
    let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"partial"))])
        .chain(stream::pending());
    let source = ByteStream::new(body, None);

    let cancel = CancellationToken::new();
    let (progress, mut rx) = ProgressReporter::new();
    let mut flow = store.flow(progress, cancel.clone());

    let trigger = tokio::spawn(async move {
        // wait until the first chunk has gone out, then cancel
        while rx.borrow_and_update().transferred == 0 {
            if rx.changed().await.is_err() {
                break;
            }
        }
        cancel.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(10), flow.run(source))
        .await
        .expect("flow did not observe cancellation");
    trigger.await.unwrap();

    assert!(matches!(result, Err(BlobError::Cancelled)));
    assert_eq!(flow.state(), StoreFlowState::Failed);
    assert!(server.state.blobs().is_empty());

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_flows_through_rendezvous() {
    let server = common::spawn_server().await;
    let store = RemoteBlobStore::new(&server.url).unwrap();
    let completed: RendezvousQueue<(usize, Result<ShareAddress, BlobError>)> =
        RendezvousQueue::new();

    const FLOWS: usize = 8;
    for i in 0..FLOWS {
        let store = store.clone();
        let completed = completed.clone();
        tokio::spawn(async move {
            let result = store
                .share(
                    BytesSource::new(format!("blob number {}", i)),
                    ProgressReporter::silent(),
                    CancellationToken::new(),
                )
                .await;
            completed.enqueue((i, result));
        });
    }

    let cancel = CancellationToken::new();
    let mut seen = vec![false; FLOWS];
    for _ in 0..FLOWS {
        let (i, result) = completed.dequeue(&cancel).await.unwrap();
        let address = result.unwrap();
        let bytes = store.fetch(&address, &cancel).await.unwrap();
        assert_eq!(bytes, Bytes::from(format!("blob number {}", i)));
        assert!(!seen[i]);
        seen[i] = true;
    }

    assert!(seen.iter().all(|s| *s));
    assert_eq!(server.state.keys().len(), FLOWS);
    assert_eq!(completed.ready_len(), 0);

    server.stop().await;
}
