use crate::api::ApiError;
use crate::crypto::IdentityError;
use crate::rendezvous::Cancelled;

use super::address::AddressError;
use super::details::DetailsError;

/// Everything that can end a store or fetch early
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Transport failure talking to the server
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The server answered with a non-success status
    #[error("HTTP status {0}: {1}")]
    HttpStatus(reqwest::StatusCode, String),
    #[error("invalid url: {0}")]
    Url(#[source] url::ParseError),
    /// The server answered, but not in a shape we understand
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The sealed coordinates could not be opened
    #[error("decryption failed: {0}")]
    Decryption(#[source] IdentityError),
    #[error("identity error: {0}")]
    Identity(#[source] IdentityError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid share address: {0}")]
    Address(#[from] AddressError),
    #[error("invalid blob details: {0}")]
    Details(#[from] DetailsError),
}

impl From<ApiError> for BlobError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Reqwest(err) => BlobError::Network(err),
            ApiError::UrlParse(err) => BlobError::Url(err),
            ApiError::HttpStatus(status, body) => BlobError::HttpStatus(status, body),
        }
    }
}

impl From<IdentityError> for BlobError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Decryption => BlobError::Decryption(IdentityError::Decryption),
            other => BlobError::Identity(other),
        }
    }
}

impl From<Cancelled> for BlobError {
    fn from(_: Cancelled) -> Self {
        BlobError::Cancelled
    }
}

impl BlobError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BlobError::Cancelled)
    }
}
