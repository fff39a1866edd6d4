use std::path::{Path, PathBuf};

use clap::Args;

use common::crypto::{IdentityError, KeyPair, LockedSecretKey};

use crate::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Identity {
    /// Passphrase the private key is locked under
    #[arg(long, env = "BLOBDROP_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,

    /// Show an existing locked identity instead of generating a new one
    #[arg(long, conflicts_with_all = ["out", "save"])]
    pub show: Option<PathBuf>,

    /// Write the locked private key to this file
    #[arg(long, conflicts_with = "save")]
    pub out: Option<PathBuf>,

    /// Write the locked private key into the blobdrop directory
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityOpError {
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("state error: {0}")]
    State(#[from] crate::state::StateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("refusing to overwrite existing identity at {0}")]
    Exists(PathBuf),
}

/// Read a locked identity written by `blobdrop identity`
pub fn load_identity(path: &Path, passphrase: &str) -> Result<KeyPair, IdentityOpError> {
    let pem = std::fs::read_to_string(path)?;
    let locked = LockedSecretKey::from_pem(&pem)?;
    Ok(KeyPair::from_locked(locked, passphrase)?)
}

#[async_trait::async_trait]
impl crate::op::Op for Identity {
    type Error = IdentityOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        if let Some(path) = &self.show {
            let pair = load_identity(path, &self.passphrase)?;
            return Ok(describe(&pair, None));
        }

        let pair = KeyPair::generate(&self.passphrase)?;

        let target = if self.save {
            Some(AppState::load(ctx.config_path.clone())?.identity_path)
        } else {
            self.out.clone()
        };

        if let Some(path) = &target {
            if path.exists() {
                return Err(IdentityOpError::Exists(path.clone()));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, pair.locked().to_pem())?;
            tracing::info!(path = %path.display(), peer_id = %pair.peer_id(), "saved identity");
        }

        Ok(describe(&pair, target.as_ref()))
    }
}

fn describe(pair: &KeyPair, saved_to: Option<&PathBuf>) -> String {
    let mut lines = vec![format!("Peer ID: {}", pair.peer_id())];
    if let Some(path) = saved_to {
        lines.push(format!("Locked key: {}", path.display()));
    }
    lines.push(String::new());
    lines.push(pair.public().to_pem().trim_end().to_string());
    lines.join("\n")
}
