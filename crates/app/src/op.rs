use std::error::Error;
use std::path::PathBuf;

use url::Url;

use common::api::{ApiClient, ApiError};
use common::blob::RemoteBlobStore;

use crate::state::{AppState, DEFAULT_SERVER_PORT};

/// Resolve the bootstrap server URL.
///
/// Priority: explicit `--remote` flag > config file `remote` > config file
/// `server_port` on localhost > hardcoded default port.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Url {
    if let Some(url) = explicit {
        return url;
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = state.config.remote_url() {
            return url;
        }
    }
    Url::parse(&format!("http://localhost:{}", DEFAULT_SERVER_PORT))
        .expect("hardcoded URL must parse")
}

#[derive(Clone)]
pub struct OpContext {
    /// API client for the resolved bootstrap server
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.blobdrop)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL and optional config path
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote)?,
            config_path,
        })
    }

    /// Blob store on the context's server, sharing its connection pool
    pub fn blob_store(&self) -> RemoteBlobStore {
        RemoteBlobStore::from_client(self.client.clone())
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999").unwrap();
        let result = resolve_remote(Some(explicit.clone()), None);
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_uses_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::state::AppConfig {
            remote: Some(Url::parse("https://drop.example.com").unwrap()),
            ..Default::default()
        };
        AppState::init(Some(dir.path().to_path_buf()), Some(config)).unwrap();

        let result = resolve_remote(None, Some(dir.path().to_path_buf()));
        assert_eq!(result.as_str(), "https://drop.example.com/");
    }

    #[test]
    fn test_resolve_remote_falls_back_to_default() {
        let result = resolve_remote(None, Some(PathBuf::from("/nonexistent")));
        assert_eq!(result.as_str(), "http://localhost:3000/");
    }
}
