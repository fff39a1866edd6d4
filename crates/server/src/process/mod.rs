pub mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::{Config, ServerState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_FILE_PREFIX: &str = "blobdrop.log";

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start server: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to shut down within {} seconds", FINAL_SHUTDOWN_TIMEOUT.as_secs())]
    ShutdownTimeout,
}

/// Handle for gracefully shutting down a running server.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    server: tokio::task::JoinHandle<()>,
    shutdown: CancellationToken,
    local_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Address the server actually bound, useful with port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Block until the server shuts down (via signal or explicit shutdown).
    pub async fn wait(self) -> Result<(), ProcessError> {
        let _ = self.graceful_waiter.await;

        match timeout(FINAL_SHUTDOWN_TIMEOUT, self.server).await {
            Ok(_) => Ok(()),
            Err(_) => {
                tracing::error!(
                    "Failed to shut down within {} seconds",
                    FINAL_SHUTDOWN_TIMEOUT.as_secs()
                );
                Err(ProcessError::ShutdownTimeout)
            }
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Initialize logging, panic handler, and build info reporting.
/// Returns guards that must be kept alive for the duration of the program.
pub fn init_logging(config: &Config) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    if let Some(log_dir) = &config.log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_env_filter = EnvFilter::builder()
            .with_default_directive(config.log_level.into())
            .from_env_lossy();

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry().with(stdout_layer).init();
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Bind the listener and spawn the server, returning its state and a handle.
///
/// The caller owns logging setup; [`spawn_service`] does both.
pub async fn start_service(config: Config) -> Result<(ServerState, ShutdownHandle), ProcessError> {
    let shutdown = CancellationToken::new();
    let graceful_waiter = utils::graceful_shutdown_blocker(shutdown.clone())?;

    let state = ServerState::new();
    let listener = TcpListener::bind(config.listen_addr).await?;
    let local_addr = listener.local_addr()?;

    let server_state = state.clone();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = http_server::serve(listener, config, server_state, server_shutdown).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let handle = ShutdownHandle {
        graceful_waiter,
        server,
        shutdown,
        local_addr,
    };

    Ok((state, handle))
}

/// Run the bootstrap server with logging until SIGINT/SIGTERM.
pub async fn spawn_service(config: Config) -> Result<(), ProcessError> {
    let _guards = init_logging(&config);
    let (_, handle) = start_service(config).await?;
    handle.wait().await
}
