use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha2::{Digest, Sha256};

pub const BLOB_HASH_SIZE: usize = 32;
pub const BLOB_SECRET_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DetailsError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected {expected} bytes, got {actual}")]
    Size { expected: usize, actual: usize },
    #[error("randomness unavailable: {0}")]
    Random(getrandom::Error),
}

fn decode_fixed<const N: usize>(hex_str: &str) -> Result<[u8; N], DetailsError> {
    let bytes = hex::decode(hex_str)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| DetailsError::Size {
            expected: N,
            actual: bytes.len(),
        })
}

/// SHA-256 digest of a blob's raw bytes
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHash(#[serde_as(as = "Hex")] [u8; BLOB_HASH_SIZE]);

impl BlobHash {
    /// Hash a complete blob
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_bytes(bytes: [u8; BLOB_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, DetailsError> {
        decode_fixed(hex_str).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; BLOB_HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlobHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobHash({})", self.to_hex())
    }
}

impl FromStr for BlobHash {
    type Err = DetailsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Per-upload retrieval secret
///
/// Anyone holding the hash and this secret can fetch the blob. Comparison
/// against a presented secret is the server's job and must be constant-time.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobSecret(#[serde_as(as = "Hex")] [u8; BLOB_SECRET_SIZE]);

impl BlobSecret {
    pub fn generate() -> Result<Self, DetailsError> {
        let mut buf = [0u8; BLOB_SECRET_SIZE];
        getrandom::getrandom(&mut buf).map_err(DetailsError::Random)?;
        Ok(Self(buf))
    }

    pub fn from_bytes(bytes: [u8; BLOB_SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, DetailsError> {
        decode_fixed(hex_str).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; BLOB_SECRET_SIZE] {
        &self.0
    }
}

impl fmt::Debug for BlobSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlobSecret(..)")
    }
}

impl FromStr for BlobSecret {
    type Err = DetailsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Retrieval coordinates of a stored blob
///
/// This is the plaintext the server seals to the uploader; on the wire it is
/// `{"blobHash": "<hex>", "secretKey": "<hex>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobStoreDetails {
    pub blob_hash: BlobHash,
    #[serde(rename = "secretKey")]
    pub secret: BlobSecret,
}

impl BlobStoreDetails {
    pub fn new(blob_hash: BlobHash, secret: BlobSecret) -> Self {
        Self { blob_hash, secret }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_of_hello() {
        let hash = BlobHash::of(b"hello");
        assert_eq!(
            hash.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_hash_hex_parse() {
        let hash = BlobHash::of(b"some bytes");
        let parsed: BlobHash = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);

        let upper = hash.to_hex().to_uppercase();
        assert_eq!(BlobHash::from_hex(&upper).unwrap(), hash);
    }

    #[test]
    fn test_hash_rejects_bad_input() {
        assert!(matches!(
            BlobHash::from_hex("zz"),
            Err(DetailsError::Hex(_))
        ));
        assert!(matches!(
            BlobHash::from_hex("abcd"),
            Err(DetailsError::Size {
                expected: 32,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_secret_generate_is_random() {
        let a = BlobSecret::generate().unwrap();
        let b = BlobSecret::generate().unwrap();
        assert_ne!(a, b);
        assert_eq!(format!("{:?}", a), "BlobSecret(..)");
    }

    #[test]
    fn test_details_wire_format() {
        let details = BlobStoreDetails::new(
            BlobHash::from_bytes([0xab; 32]),
            BlobSecret::from_bytes([0x01; 32]),
        );
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["blobHash"], "ab".repeat(32));
        assert_eq!(json["secretKey"], "01".repeat(32));
        assert_eq!(json.as_object().unwrap().len(), 2);

        let parsed: BlobStoreDetails = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, details);
    }

    #[test]
    fn test_details_rejects_short_fields() {
        let json = r#"{"blobHash":"abcd","secretKey":"01"}"#;
        assert!(serde_json::from_str::<BlobStoreDetails>(json).is_err());
    }
}
