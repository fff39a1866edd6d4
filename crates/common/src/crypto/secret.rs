//! Symmetric encryption using ChaCha20-Poly1305
//!
//! A [`Secret`] is a 256-bit AEAD key. It protects two things in this crate:
//! - **Sealed payloads**: the key agreed by ECDH in [`super::sealed`]
//! - **Locked private keys**: the key derived from a passphrase in [`super::identity`]
//!
//! Keys are either drawn from the OS RNG or derived with HKDF-SHA256.

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
    /// Authentication failed: wrong key, or the ciphertext was altered
    #[error("decrypt error")]
    Decrypt,
}

/// A 256-bit symmetric encryption key
///
/// The encrypted format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
/// A fresh random nonce is drawn for every encryption.
#[derive(PartialEq, Eq, Clone)]
pub struct Secret([u8; SECRET_SIZE]);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff)
            .map_err(|e| anyhow::anyhow!("failed to generate random bytes: {}", e))?;
        Ok(Self(buff))
    }

    /// Derive a secret from input keying material with HKDF-SHA256
    pub fn derive(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<Self, SecretError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = [0u8; SECRET_SIZE];
        hkdf.expand(info, &mut okm)
            .map_err(|e| anyhow::anyhow!("hkdf expand failed: {}", e))?;
        Ok(Self(okm))
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encrypt data using ChaCha20-Poly1305 AEAD
    ///
    /// The output format is: `nonce (12 bytes) || ciphertext || auth_tag (16 bytes)`.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Decrypt data using ChaCha20-Poly1305 AEAD
    ///
    /// Expects input in the format: `nonce (12 bytes) || ciphertext || auth_tag (16 bytes)`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Decrypt`] if the data is too short to hold a nonce and
    /// tag, or if authentication fails (data was tampered with or wrong key).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(SecretError::Decrypt);
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| SecretError::Decrypt)
    }
}
