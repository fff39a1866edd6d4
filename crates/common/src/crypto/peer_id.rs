use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::keys::{KeyError, PublicKey};

/// Size of a peer id (SHA-256 digest) in bytes
pub const PEER_ID_SIZE: usize = 32;

/// Stable address of a peer
///
/// The SHA-256 fingerprint of the peer's raw public key bytes, written as
/// lowercase hex. Bootstrap servers key registered public keys by this value, so
/// the derivation is part of the wire format: changing it breaks every deployed
/// server.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerId([u8; PEER_ID_SIZE]);

impl PeerId {
    /// Fingerprint a public key
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = Sha256::digest(key.to_bytes());
        PeerId(digest.into())
    }

    /// Parse a peer id from hex, with or without a "0x" prefix
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PEER_ID_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("peer id hex decode error"))?;
        Ok(PeerId(buff))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; PEER_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl FromStr for PeerId {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PeerId {
    type Error = KeyError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<PeerId> for String {
    fn from(id: PeerId) -> Self {
        id.to_hex()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_peer_id_is_deterministic() {
        let public_key = SecretKey::generate().public();
        assert_eq!(public_key.peer_id(), public_key.peer_id());
        assert_eq!(PeerId::from_public_key(&public_key), public_key.peer_id());
    }

    #[test]
    fn test_distinct_keys_distinct_ids() {
        let a = SecretKey::generate().public().peer_id();
        let b = SecretKey::generate().public().peer_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_peer_id_is_sha256_of_key_bytes() {
        let public_key = SecretKey::from([7u8; 32]).public();
        let expected = hex::encode(Sha256::digest(public_key.to_bytes()));
        assert_eq!(public_key.peer_id().to_hex(), expected);
    }

    #[test]
    fn test_peer_id_hex_is_lowercase_and_parses() {
        let id = SecretKey::generate().public().peer_id();
        let hex = id.to_string();
        assert_eq!(hex.len(), PEER_ID_SIZE * 2);
        assert_eq!(hex, hex.to_lowercase());

        assert_eq!(hex.parse::<PeerId>().unwrap(), id);
        assert_eq!(PeerId::from_hex(&hex.to_uppercase()).unwrap(), id);
        assert_eq!(PeerId::from_hex(&format!("0x{}", hex)).unwrap(), id);
    }

    #[test]
    fn test_peer_id_rejects_bad_hex() {
        assert!(PeerId::from_hex("zz").is_err());
        assert!(PeerId::from_hex("abcd").is_err());
    }
}
