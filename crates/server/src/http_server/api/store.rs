use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;

use common::api::StoreBlobQuery;
use common::crypto::{PeerId, SealedMessage};

use crate::ServerState;

/// Store the body for a registered peer and answer with the blob's
/// coordinates sealed to that peer's key
#[tracing::instrument(skip_all, fields(peer_id = %query.p, len = body.len()))]
pub async fn handler(
    State(state): State<ServerState>,
    Query(query): Query<StoreBlobQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, StoreError> {
    let public_key = state
        .keys()
        .get(&query.p)
        .ok_or(StoreError::UnknownPeer(query.p))?;

    let details = state.blobs().put(body).map_err(anyhow::Error::from)?;
    let plaintext = serde_json::to_vec(&details).map_err(anyhow::Error::from)?;
    let sealed = SealedMessage::seal(&plaintext, &public_key).map_err(anyhow::Error::from)?;

    tracing::info!(blob_hash = %details.blob_hash, "blob stored");

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        sealed.to_pem(),
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),
    #[error("Failed to store blob: {0}")]
    Default(#[from] anyhow::Error),
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            StoreError::UnknownPeer(peer_id) => (
                StatusCode::NOT_FOUND,
                format!("Unknown peer: {}", peer_id),
            )
                .into_response(),
            StoreError::Default(e) => {
                tracing::error!(error = %e, "failed to store blob");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store blob".to_string(),
                )
                    .into_response()
            }
        }
    }
}
