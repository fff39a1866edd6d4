use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;

use common::crypto::PublicKey;

use crate::ServerState;

/// Register the PEM public key in the body; answers with its peer id
#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServerState>,
    body: String,
) -> Result<impl IntoResponse, PublishKeyError> {
    let public_key = PublicKey::from_pem(body.trim())
        .map_err(|e| PublishKeyError::InvalidPublicKey(e.to_string()))?;

    let peer_id = state.keys().register(public_key);

    Ok((StatusCode::CREATED, peer_id.to_hex()))
}

#[derive(Debug, thiserror::Error)]
pub enum PublishKeyError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl IntoResponse for PublishKeyError {
    fn into_response(self) -> Response {
        match self {
            PublishKeyError::InvalidPublicKey(msg) => {
                tracing::debug!(error = %msg, "rejected public key");
                (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid public key: {}", msg),
                )
                    .into_response()
            }
        }
    }
}
