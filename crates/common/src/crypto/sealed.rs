//! Public-key sealing using ECDH + ChaCha20-Poly1305
//!
//! A bootstrap server uses this to hand blob coordinates back to the peer that
//! uploaded the blob: the coordinates are sealed to the peer's published public
//! key, so only the holder of the matching private key can read the secret.
//!
//! # Protocol Overview
//!
//! To seal a payload for a recipient:
//! 1. **Generate ephemeral keypair**: Create a throwaway Ed25519 keypair
//! 2. **Perform ECDH**: Convert both keys to X25519 and compute the shared secret
//! 3. **Derive key**: HKDF-SHA256 over the shared secret, salted with both public keys
//! 4. **Encrypt**: ChaCha20-Poly1305 under the derived key
//!
//! The recipient repeats the ECDH with their private key and the ephemeral public
//! key carried in the message, derives the same key and decrypts.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pubkey: 32 bytes ][ nonce: 12 bytes ][ ciphertext ][ tag: 16 bytes ]
//! ```
//!
//! In transit the message is armored as a PEM block tagged `SEALED MESSAGE`.

use super::keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{Secret, SecretError, NONCE_SIZE, TAG_SIZE};

/// PEM tag of an armored sealed message
pub const SEALED_PEM_TAG: &str = "SEALED MESSAGE";
/// Smallest possible sealed message (empty plaintext)
pub const MIN_SEALED_SIZE: usize = PUBLIC_KEY_SIZE + NONCE_SIZE + TAG_SIZE;

const SEAL_INFO: &[u8] = b"blobdrop sealed message v1";

/// Errors that can occur while sealing or opening a message
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("seal error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("malformed sealed message: {0}")]
    Malformed(String),
}

/// A payload encrypted to a single recipient's public key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedMessage(Vec<u8>);

impl TryFrom<Vec<u8>> for SealedMessage {
    type Error = SealError;
    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < MIN_SEALED_SIZE {
            return Err(SealError::Malformed(format!(
                "expected at least {} bytes, got {}",
                MIN_SEALED_SIZE,
                bytes.len()
            )));
        }
        Ok(SealedMessage(bytes))
    }
}

impl SealedMessage {
    /// Seal `plaintext` so only the holder of `recipient`'s private key can open it
    pub fn seal(plaintext: &[u8], recipient: &PublicKey) -> Result<Self, SealError> {
        let ephemeral = SecretKey::generate();
        let ephemeral_public = ephemeral.public();

        let shared = ephemeral.to_x25519().diffie_hellman(&recipient.to_x25519()?);
        let key = message_key(shared.as_bytes(), &ephemeral_public, recipient)?;
        let ciphertext = key.encrypt(plaintext)?;

        let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE + ciphertext.len());
        out.extend_from_slice(&ephemeral_public.to_bytes());
        out.extend_from_slice(&ciphertext);
        Ok(SealedMessage(out))
    }

    /// Open the message with the recipient's private key
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Secret`] wrapping [`SecretError::Decrypt`] if the key
    /// does not match or the message was altered in transit.
    pub fn open(&self, recipient: &SecretKey) -> Result<Vec<u8>, SealError> {
        let (ephemeral_bytes, ciphertext) = self.0.split_at(PUBLIC_KEY_SIZE);
        let ephemeral_public = PublicKey::try_from(ephemeral_bytes)?;

        let shared = recipient
            .to_x25519()
            .diffie_hellman(&ephemeral_public.to_x25519()?);
        let key = message_key(shared.as_bytes(), &ephemeral_public, &recipient.public())?;
        Ok(key.decrypt(ciphertext)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Armor the message as PEM text
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(SEALED_PEM_TAG, self.0.clone()))
    }

    /// Parse an armored message
    pub fn from_pem(pem_str: &str) -> Result<Self, SealError> {
        let pem = pem::parse(pem_str).map_err(|e| SealError::Malformed(e.to_string()))?;
        if pem.tag() != SEALED_PEM_TAG {
            return Err(SealError::Malformed(format!(
                "invalid PEM tag, expected {}",
                SEALED_PEM_TAG
            )));
        }
        pem.into_contents().try_into()
    }
}

fn message_key(
    shared: &[u8],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Secret, SealError> {
    let mut salt = [0u8; PUBLIC_KEY_SIZE * 2];
    salt[..PUBLIC_KEY_SIZE].copy_from_slice(&ephemeral.to_bytes());
    salt[PUBLIC_KEY_SIZE..].copy_from_slice(&recipient.to_bytes());
    Ok(Secret::derive(shared, &salt, SEAL_INFO)?)
}
