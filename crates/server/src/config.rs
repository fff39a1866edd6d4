use std::net::SocketAddr;
use std::path::PathBuf;

use url::Url;

/// Maximum upload size in bytes (500 MB)
pub const MAX_UPLOAD_SIZE_BYTES: usize = 500 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // Base URL peers reach this server at; share addresses start with it
    pub public_url: Url,
    // log level for http tracing and the default log filter
    pub log_level: tracing::Level,
    /// Directory for log files (stdout only if not set)
    pub log_dir: Option<PathBuf>,
    /// Largest accepted upload body
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn new(listen_addr: SocketAddr) -> Result<Self, ConfigError> {
        let public_url = Url::parse(&format!("http://localhost:{}", listen_addr.port()))?;
        Ok(Self {
            listen_addr,
            public_url,
            log_level: tracing::Level::INFO,
            log_dir: None,
            max_upload_bytes: MAX_UPLOAD_SIZE_BYTES,
        })
    }

    /// Listen on all interfaces at `port`
    pub fn with_port(port: u16) -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
        Self::new(listen_addr)
    }

    pub fn public_url(mut self, url: Url) -> Self {
        self.public_url = url;
        self
    }

    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn log_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid Socket Address: {0}")]
    ListenAddr(#[from] std::net::AddrParseError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_port(3000).unwrap();
        assert_eq!(config.listen_addr.port(), 3000);
        assert_eq!(config.public_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.max_upload_bytes, MAX_UPLOAD_SIZE_BYTES);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let url = Url::parse("https://drop.example.com").unwrap();
        let config = Config::with_port(0)
            .unwrap()
            .public_url(url.clone())
            .log_level(tracing::Level::DEBUG)
            .max_upload_bytes(1024);
        assert_eq!(config.public_url, url);
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.max_upload_bytes, 1024);
    }
}
