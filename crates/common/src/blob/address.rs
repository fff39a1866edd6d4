use std::fmt;
use std::str::FromStr;

use url::Url;

use super::details::{BlobHash, BlobSecret, BlobStoreDetails, DetailsError};
use crate::api::join_segments;

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("not a blob address: {0}")]
    NotBlobPath(String),
    #[error("missing psk query parameter")]
    MissingSecret,
    #[error("invalid blob coordinates: {0}")]
    Details(#[from] DetailsError),
}

/// Shareable retrieval address: `{base}/blob/{hexHash}?psk={hexSecret}`
///
/// Whoever holds the address can fetch the blob from the server at `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareAddress {
    base: Url,
    details: BlobStoreDetails,
    url: Url,
}

impl ShareAddress {
    pub fn new(base: &Url, details: BlobStoreDetails) -> Result<Self, AddressError> {
        let mut url = join_segments(base, &["blob", &details.blob_hash.to_hex()])?;
        url.query_pairs_mut()
            .append_pair("psk", &details.secret.to_hex());

        let mut base = base.clone();
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self { base, details, url })
    }

    /// Server the blob lives on
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn details(&self) -> &BlobStoreDetails {
        &self.details
    }

    pub fn hash(&self) -> &BlobHash {
        &self.details.blob_hash
    }

    pub fn secret(&self) -> &BlobSecret {
        &self.details.secret
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    pub fn into_details(self) -> BlobStoreDetails {
        self.details
    }
}

impl fmt::Display for ShareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl FromStr for ShareAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s)?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        let (hash, prefix) = match segments.as_slice() {
            [prefix @ .., "blob", hash] if !hash.is_empty() => (*hash, prefix.to_vec()),
            _ => return Err(AddressError::NotBlobPath(url.path().to_string())),
        };
        let hash = BlobHash::from_hex(hash)?;

        let secret = url
            .query_pairs()
            .find(|(key, _)| key == "psk")
            .map(|(_, value)| BlobSecret::from_hex(&value))
            .ok_or(AddressError::MissingSecret)??;

        let mut base = url.clone();
        base.set_query(None);
        base.set_fragment(None);
        base.set_path(&prefix.join("/"));

        Self::new(&base, BlobStoreDetails::new(hash, secret))
    }
}
