use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "blobdrop";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const IDENTITY_FILE_NAME: &str = "identity.pem";

/// Port the bootstrap server listens on when nothing else is configured
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for `blobdrop serve`
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Bootstrap server used by `store`, `fetch` and `health`
    #[serde(default)]
    pub remote: Option<Url>,
    /// Default log filter directive for `serve` (RUST_LOG overrides it)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling server logs
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Largest upload `serve` accepts, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_bytes() -> usize {
    server::config::MAX_UPLOAD_SIZE_BYTES
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: default_server_port(),
            remote: None,
            log_level: default_log_level(),
            log_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    /// Server to talk to: the configured remote, else our own local server
    pub fn remote_url(&self) -> Result<Url, url::ParseError> {
        match &self.remote {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("http://localhost:{}", self.server_port)),
        }
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, StateError> {
        self.log_level
            .parse()
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the blobdrop directory (~/.blobdrop)
    pub blobdrop_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Where `identity --save` keeps the locked private key
    pub identity_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the blobdrop directory path (custom or default ~/.blobdrop)
    pub fn blobdrop_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new blobdrop state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let blobdrop_dir = Self::blobdrop_dir(custom_path)?;

        if blobdrop_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&blobdrop_dir)?;

        let config = config.unwrap_or_default();
        let config_path = blobdrop_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            identity_path: blobdrop_dir.join(IDENTITY_FILE_NAME),
            blobdrop_dir,
            config_path,
            config,
        })
    }

    /// Load existing state from the blobdrop directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let blobdrop_dir = Self::blobdrop_dir(custom_path)?;
        let config_path = blobdrop_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            identity_path: blobdrop_dir.join(IDENTITY_FILE_NAME),
            blobdrop_dir,
            config_path,
            config,
        })
    }

    /// Configured settings, or defaults when `init` was never run
    pub fn load_config_or_default(custom_path: Option<PathBuf>) -> Result<AppConfig, StateError> {
        match Self::load(custom_path) {
            Ok(state) => Ok(state.config),
            Err(StateError::NotInitialized) => Ok(AppConfig::default()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("blobdrop directory not initialized. Run 'blobdrop init' first")]
    NotInitialized,

    #[error("blobdrop directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
