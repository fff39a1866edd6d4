//! HTTP contract of a bootstrap server
//!
//! Request types know how to build themselves against a base URL; the server
//! crate routes on the same path constants and extracts the same query types.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

mod client;
mod error;
mod fetch;
mod publish_key;
mod store;

pub use client::ApiClient;
pub use error::ApiError;
pub use fetch::{FetchBlobQuery, FetchBlobRequest};
pub use publish_key::PublishKeyRequest;
pub use store::{StoreBlobQuery, StoreBlobRequest};

/// Route of the key registration endpoint
pub const PUBLIC_KEY_PATH: &str = "/pk";
/// Route of the blob upload endpoint
pub const STORE_BLOB_PATH: &str = "/blob/store";
/// Route of the blob retrieval endpoint (axum path syntax)
pub const FETCH_BLOB_PATH: &str = "/blob/:hash";

/// Content type of a published public key
pub const PUBLIC_KEY_CONTENT_TYPE: &str = "application/pgp-keys";
/// Content type of raw blob bytes
pub const BLOB_CONTENT_TYPE: &str = "application/octet-stream";

/// A request against the bootstrap server API
pub trait ApiRequest {
    type Response: FromResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError>;
}

/// Decode a successful response body
#[async_trait]
pub trait FromResponse: Sized {
    async fn from_response(response: Response) -> Result<Self, ApiError>;
}

#[async_trait]
impl FromResponse for () {
    async fn from_response(_response: Response) -> Result<Self, ApiError> {
        Ok(())
    }
}

#[async_trait]
impl FromResponse for String {
    async fn from_response(response: Response) -> Result<Self, ApiError> {
        Ok(response.text().await?)
    }
}

/// Append path segments to a base URL, keeping any path prefix the base has.
///
/// `http://host/prefix/` + `["blob", "abc"]` gives `http://host/prefix/blob/abc`.
pub fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
