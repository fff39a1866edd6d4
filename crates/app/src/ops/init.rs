use clap::Args;
use url::Url;

use crate::state::{AppConfig, AppState, DEFAULT_SERVER_PORT};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port `blobdrop serve` listens on
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    pub server_port: u16,

    /// Bootstrap server to store to and fetch from (default: the local server)
    #[arg(long = "server-url")]
    pub server_url: Option<Url>,

    /// Directory for server log files
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            server_port: self.server_port,
            remote: self.server_url.clone(),
            log_dir: self.log_dir.clone(),
            ..AppConfig::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let remote = match &state.config.remote {
            Some(url) => url.to_string(),
            None => format!("local (port {})", state.config.server_port),
        };

        let output = format!(
            "Initialized blobdrop directory at: {}\n\
             - Config: {}\n\
             - Server port: {}\n\
             - Remote: {}",
            state.blobdrop_dir.display(),
            state.config_path.display(),
            state.config.server_port,
            remote
        );

        Ok(output)
    }
}
