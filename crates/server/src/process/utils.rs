use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long SIGTERM waits for in-flight uploads before shutting down
const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Spawns a task that cancels `shutdown` on SIGINT or SIGTERM
///
/// The task also ends when `shutdown` is cancelled by someone else, so it can
/// always be awaited.
pub fn graceful_shutdown_blocker(shutdown: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::debug!("gracefully exiting immediately on SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::debug!("initiating graceful shutdown with delay on SIGTERM");
                tokio::time::sleep(REQUEST_GRACE_PERIOD).await;
            }
            _ = shutdown.cancelled() => {
                tracing::debug!("shutdown requested");
            }
        }

        shutdown.cancel();
    });

    Ok(handle)
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        build_profile = ?build.build_profile,
        features = ?build.build_features,
        version = ?build.version,
        "bootstrap server starting up"
    );
}
