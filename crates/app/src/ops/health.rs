use clap::Args;

use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:   {}", state.blobdrop_dir.display()));
                lines.push("  config.toml: OK".to_string());
                let identity = if state.identity_path.exists() {
                    "OK"
                } else {
                    "none"
                };
                lines.push(format!("  identity:    {}", identity));
                lines.push(format!("  server_port: {}", state.config.server_port));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();
        let status_url = |path: &str| {
            format!("{}/_status/{}", base.as_str().trim_end_matches('/'), path)
        };

        lines.push(String::new());
        lines.push(format!("Server ({}):", base));

        match client.get(status_url("livez")).send().await {
            Ok(resp) if resp.status().is_success() => {
                lines.push("  livez:   OK".to_string());
            }
            Ok(resp) => {
                lines.push(format!("  livez:   UNHEALTHY ({})", resp.status()));
            }
            Err(_) => {
                lines.push("  livez:   NOT REACHABLE".to_string());
                return Ok(lines.join("\n"));
            }
        }

        match client.get(status_url("version")).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => lines.push(format!("  version: {}", body)),
                Err(e) => lines.push(format!("  version: unreadable ({})", e)),
            },
            Ok(resp) => {
                lines.push(format!("  version: UNAVAILABLE ({})", resp.status()));
            }
            Err(_) => {
                lines.push("  version: NOT REACHABLE".to_string());
            }
        }

        Ok(lines.join("\n"))
    }
}
