use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use url::Url;

use super::{join_segments, ApiError, ApiRequest, PUBLIC_KEY_CONTENT_TYPE};
use crate::crypto::PublicKey;

/// Register a public key with the server
///
/// The server answers `201 Created` with the hex peer id as text; the client
/// derives the same id locally, so the body is not read.
#[derive(Debug, Clone)]
pub struct PublishKeyRequest {
    pub public_key: PublicKey,
}

impl ApiRequest for PublishKeyRequest {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = join_segments(base_url, &["pk"])?;
        Ok(client
            .post(full_url)
            .header(CONTENT_TYPE, PUBLIC_KEY_CONTENT_TYPE)
            .body(self.public_key.to_pem()))
    }
}
