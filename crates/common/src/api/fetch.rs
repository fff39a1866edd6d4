use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{join_segments, ApiError, ApiRequest};
use crate::blob::{BlobHash, BlobSecret, ByteStream};

/// Query string of the retrieval endpoint: `?psk=<secret hex>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchBlobQuery {
    pub psk: BlobSecret,
}

#[derive(Debug, Clone)]
pub struct FetchBlobRequest {
    pub hash: BlobHash,
    pub secret: BlobSecret,
}

impl ApiRequest for FetchBlobRequest {
    type Response = ByteStream;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = join_segments(base_url, &["blob", &self.hash.to_hex()])?;
        Ok(client
            .get(full_url)
            .query(&FetchBlobQuery { psk: self.secret }))
    }
}
