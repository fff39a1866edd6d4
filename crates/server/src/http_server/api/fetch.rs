use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use serde::Deserialize;

use common::api::BLOB_CONTENT_TYPE;
use common::blob::{BlobHash, BlobSecret};

use crate::ServerState;

/// The secret stays optional here: a missing one must look exactly like a
/// wrong one, not like a malformed request.
#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub psk: Option<String>,
}

#[tracing::instrument(skip_all, fields(blob_hash = %hash))]
pub async fn handler(
    State(state): State<ServerState>,
    Path(hash): Path<String>,
    Query(params): Query<FetchParams>,
) -> Result<impl IntoResponse, FetchError> {
    let hash = BlobHash::from_hex(&hash).map_err(|e| FetchError::InvalidHash(e.to_string()))?;
    let secret = params
        .psk
        .as_deref()
        .map(BlobSecret::from_hex)
        .transpose()
        .map_err(|e| FetchError::InvalidSecret(e.to_string()))?
        .ok_or(FetchError::NotFound)?;

    let bytes = state
        .blobs()
        .get(&hash, &secret)
        .ok_or(FetchError::NotFound)?;

    tracing::debug!(len = bytes.len(), "serving blob");
    Ok((StatusCode::OK, [(CONTENT_TYPE, BLOB_CONTENT_TYPE)], bytes))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid blob hash: {0}")]
    InvalidHash(String),
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
    #[error("Blob not found")]
    NotFound,
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        match self {
            FetchError::InvalidHash(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid blob hash: {}", msg),
            )
                .into_response(),
            FetchError::InvalidSecret(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid secret: {}", msg),
            )
                .into_response(),
            // unknown hash and wrong secret are deliberately the same answer
            FetchError::NotFound => (StatusCode::NOT_FOUND, "Blob not found").into_response(),
        }
    }
}
