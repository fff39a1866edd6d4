//! Shared helpers for end-to-end tests against an in-process server
#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use server::{Config, ServerState};

pub struct TestServer {
    pub url: Url,
    pub addr: SocketAddr,
    pub state: ServerState,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap();
    }
}

/// Spawn a server on an ephemeral loopback port
pub async fn spawn_server() -> TestServer {
    spawn_server_with(|config| config).await
}

pub async fn spawn_server_with(configure: impl FnOnce(Config) -> Config) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("http://{}", addr)).unwrap();

    let config = configure(Config::new(addr).unwrap().public_url(url.clone()));
    let state = ServerState::new();
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn({
        let state = state.clone();
        let shutdown = shutdown.clone();
        async move {
            server::http_server::serve(listener, config, state, shutdown)
                .await
                .unwrap();
        }
    });

    TestServer {
        url,
        addr,
        state,
        shutdown,
        handle,
    }
}
