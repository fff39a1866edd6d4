use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{join_segments, ApiError, ApiRequest, BLOB_CONTENT_TYPE};
use crate::crypto::PeerId;

/// Query string of the upload endpoint: `?p=<peer id hex>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreBlobQuery {
    pub p: PeerId,
}

/// Upload raw blob bytes on behalf of a registered peer
///
/// The response is the PEM-armored sealed [`BlobStoreDetails`](crate::blob::BlobStoreDetails).
#[derive(Debug)]
pub struct StoreBlobRequest {
    pub peer_id: PeerId,
    pub body: Body,
    /// Known size of the body; unknown sizes go out chunked
    pub len: Option<u64>,
}

impl ApiRequest for StoreBlobRequest {
    type Response = String;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = join_segments(base_url, &["blob", "store"])?;
        let mut builder = client
            .post(full_url)
            .query(&StoreBlobQuery { p: self.peer_id })
            .header(CONTENT_TYPE, BLOB_CONTENT_TYPE);
        if let Some(len) = self.len {
            builder = builder.header(CONTENT_LENGTH, len);
        }
        Ok(builder.body(self.body))
    }
}
