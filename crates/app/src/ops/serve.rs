use std::path::PathBuf;

use clap::Args;
use url::Url;

use server::{spawn_service, Config};

use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override listen port (default from config)
    #[arg(long)]
    pub port: Option<u16>,

    /// URL peers reach this server at (default: http://localhost:<port>)
    #[arg(long)]
    pub public_url: Option<Url>,

    /// Directory for log files (default from config, stdout only if unset)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("state error: {0}")]
    StateError(#[from] crate::state::StateError),

    #[error("invalid server config: {0}")]
    Config(#[from] server::config::ConfigError),

    #[error("server failed: {0}")]
    Failed(#[from] server::process::ProcessError),
}

#[async_trait::async_trait]
impl crate::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let app_config = AppState::load_config_or_default(ctx.config_path.clone())?;

        let mut config = Config::with_port(self.port.unwrap_or(app_config.server_port))?
            .log_level(app_config.tracing_level()?)
            .log_dir(self.log_dir.clone().or(app_config.log_dir))
            .max_upload_bytes(app_config.max_upload_bytes);
        if let Some(url) = &self.public_url {
            config = config.public_url(url.clone());
        }

        spawn_service(config).await?;
        Ok("server stopped".to_string())
    }
}
