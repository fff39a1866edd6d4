use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::peer_id::PeerId;

/// Size of Ed25519 private key in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// PEM tag used when a public key is published to a bootstrap server
pub const PUBLIC_KEY_PEM_TAG: &str = "PUBLIC KEY";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of a peer identity
///
/// Holds the raw bytes of an Ed25519 verifying key. The bytes are checked to be a
/// valid curve point on construction, so every `PublicKey` can be used for
/// signature verification and for sealing payloads (after conversion to X25519).
///
/// The fingerprint of these bytes is the peer's [`PeerId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl TryFrom<[u8; PUBLIC_KEY_SIZE]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Result<Self, Self::Error> {
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| anyhow::anyhow!("invalid ed25519 public key: {}", e))?;
        Ok(PublicKey(bytes))
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        buff.try_into()
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;
    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Self::from_hex(&hex)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("public key hex decode error"))?;
        buff.try_into()
    }

    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    /// Convert public key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Fingerprint of this key, used to address the peer
    pub fn peer_id(&self) -> PeerId {
        PeerId::from_public_key(self)
    }

    /// Encode the public key in PEM format for publication
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new(PUBLIC_KEY_PEM_TAG, self.0.to_vec());
        pem::encode(&pem)
    }

    /// Parse a public key from PEM format
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The PEM string is malformed
    /// - The PEM tag is not "PUBLIC KEY"
    /// - The contents are not a valid Ed25519 point
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;

        if pem.tag() != PUBLIC_KEY_PEM_TAG {
            return Err(anyhow::anyhow!("invalid PEM tag, expected {}", PUBLIC_KEY_PEM_TAG).into());
        }

        Self::try_from(pem.contents())
    }

    /// Convert Ed25519 public key to X25519 (Montgomery curve) for ECDH
    ///
    /// Sealed payloads are encrypted under a Diffie-Hellman secret, which needs the
    /// Montgomery form of the Edwards point.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ed25519 point cannot be converted (invalid point).
    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_x25519(&self) -> Result<X25519PublicKey, KeyError> {
        let edwards_point = CompressedEdwardsY::from_slice(&self.0)
            .map_err(|_| anyhow::anyhow!("public key invalid edwards point"))?
            .decompress()
            .ok_or_else(|| anyhow::anyhow!("public key failed to decompress edwards point"))?;

        let montgomery_point = edwards_point.to_montgomery();
        Ok(X25519PublicKey::from(montgomery_point.to_bytes()))
    }

    /// Verify an Ed25519 signature on a message.
    ///
    /// A valid signature proves the signer holds the private key behind this
    /// key's [`PeerId`].
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), ed25519_dalek::SignatureError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)?;
        verifying_key.verify_strict(msg, signature)
    }
}

/// Private half of a peer identity
///
/// Never leaves local custody. At rest it is only stored locked under a
/// passphrase, see [`super::LockedSecretKey`].
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public().peer_id()).finish()
    }
}

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(secret: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&secret))
    }
}

impl SecretKey {
    /// Parse a secret key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PRIVATE_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| anyhow::anyhow!("private key hex decode error"))?;
        Ok(Self::from(buff))
    }

    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        Self::from(bytes)
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    /// Convert secret key to raw bytes
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert secret key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Convert Ed25519 secret key to X25519 (Montgomery curve) for ECDH
    ///
    /// The clamped scalar of the Ed25519 key is used directly as the X25519
    /// private key, matching [`PublicKey::to_x25519`].
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0.to_scalar_bytes())
    }

    /// Sign a message with this secret key using Ed25519.
    pub fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
        self.0.sign(msg)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate();
        let public_key = private_key.public();

        let private_hex = private_key.to_hex();
        let recovered_private = SecretKey::from_hex(&private_hex).unwrap();
        assert_eq!(private_key.to_bytes(), recovered_private.to_bytes());

        let public_hex = public_key.to_hex();
        let recovered_public = PublicKey::from_hex(&public_hex).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_public_key_pem() {
        let public_key = SecretKey::generate().public();

        let pem = public_key.to_pem();
        assert!(pem.contains("BEGIN PUBLIC KEY"));
        assert_eq!(PublicKey::from_pem(&pem).unwrap(), public_key);
    }

    #[test]
    fn test_public_key_pem_rejects_wrong_tag() {
        let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![0u8; PUBLIC_KEY_SIZE]));
        assert!(PublicKey::from_pem(&pem).is_err());
    }

    #[test]
    fn test_public_key_size_validation() {
        assert!(PublicKey::try_from(&[1u8; 16][..]).is_err());
        assert!(PublicKey::try_from(&[1u8; 64][..]).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate();
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert!(public_key.verify(message, &signature).is_ok());

        assert!(public_key.verify(b"hello, world?", &signature).is_err());

        let other_key = SecretKey::generate().public();
        assert!(other_key.verify(message, &signature).is_err());
    }

    #[test]
    fn test_x25519_conversion_agrees() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let ab = alice.to_x25519().diffie_hellman(&bob.public().to_x25519().unwrap());
        let ba = bob.to_x25519().diffie_hellman(&alice.public().to_x25519().unwrap());
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_public_key_serde_as_hex() {
        let public_key = SecretKey::generate().public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key.to_hex()));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, public_key);
    }
}
