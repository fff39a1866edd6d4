//! Passphrase-protected peer identities
//!
//! A [`KeyPair`] keeps its private half only in locked form. Every operation
//! that needs the private key takes the passphrase, unlocks a transient
//! [`SecretKey`] and drops it when done.

use argon2::{Algorithm, Argon2, Params, Version};

use super::keys::{KeyError, PublicKey, SecretKey, PRIVATE_KEY_SIZE};
use super::peer_id::PeerId;
use super::sealed::{SealError, SealedMessage};
use super::secret::{Secret, SecretError, SECRET_SIZE};

/// Size of the random salt mixed into the passphrase derivation
pub const SALT_SIZE: usize = 16;
/// PEM tag of a locked private key
pub const LOCKED_KEY_PEM_TAG: &str = "ENCRYPTED PRIVATE KEY";

/// Argon2id memory cost in KiB
const LOCK_MEMORY_KIB: u32 = 19 * 1024;
/// Argon2id passes over memory
const LOCK_ITERATIONS: u32 = 2;
const LOCK_PARALLELISM: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    /// Wrong passphrase, wrong key, or malformed / tampered ciphertext
    #[error("decryption failed")]
    Decryption,
}

impl From<SecretError> for IdentityError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::Decrypt => IdentityError::Decryption,
            SecretError::Default(e) => IdentityError::Default(e),
        }
    }
}

impl From<SealError> for IdentityError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Default(e) => IdentityError::Default(e),
            // anything wrong with the message itself is indistinguishable from tampering
            SealError::Key(_) | SealError::Secret(_) | SealError::Malformed(_) => {
                IdentityError::Decryption
            }
        }
    }
}

/// A private key encrypted under a passphrase
///
/// Layout: `salt (16 bytes) || nonce (12 bytes) || encrypted key (32 bytes) || tag (16 bytes)`.
/// The encryption key is Argon2id over the passphrase, salted per lock, so a
/// leaked PEM costs an attacker one memory-hard derivation per guess.
#[derive(Clone, PartialEq, Eq)]
pub struct LockedSecretKey(Vec<u8>);

impl std::fmt::Debug for LockedSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LockedSecretKey(..)")
    }
}

impl LockedSecretKey {
    pub fn lock(key: &SecretKey, passphrase: &str) -> Result<Self, IdentityError> {
        let mut salt = [0u8; SALT_SIZE];
        getrandom::getrandom(&mut salt)
            .map_err(|e| anyhow::anyhow!("failed to generate salt: {}", e))?;

        let kek = derive_lock_key(passphrase, &salt)?;
        let ciphertext = kek.encrypt(&key.to_bytes())?;

        let mut out = Vec::with_capacity(SALT_SIZE + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&ciphertext);
        Ok(Self(out))
    }

    /// Recover the private key
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Decryption`] if the passphrase is wrong or the
    /// locked bytes were corrupted.
    pub fn unlock(&self, passphrase: &str) -> Result<SecretKey, IdentityError> {
        if self.0.len() < SALT_SIZE {
            return Err(IdentityError::Decryption);
        }
        let (salt, ciphertext) = self.0.split_at(SALT_SIZE);
        let kek = derive_lock_key(passphrase, salt)?;
        let plaintext = kek.decrypt(ciphertext)?;

        let bytes: [u8; PRIVATE_KEY_SIZE] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::Decryption)?;
        Ok(SecretKey::from(bytes))
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(LOCKED_KEY_PEM_TAG, self.0.clone()))
    }

    pub fn from_pem(pem_str: &str) -> Result<Self, IdentityError> {
        let pem = pem::parse(pem_str).map_err(|e| anyhow::anyhow!("failed to parse PEM: {}", e))?;
        if pem.tag() != LOCKED_KEY_PEM_TAG {
            return Err(anyhow::anyhow!("invalid PEM tag, expected {}", LOCKED_KEY_PEM_TAG).into());
        }
        Ok(Self(pem.into_contents()))
    }
}

fn derive_lock_key(passphrase: &str, salt: &[u8]) -> Result<Secret, IdentityError> {
    let params = Params::new(
        LOCK_MEMORY_KIB,
        LOCK_ITERATIONS,
        LOCK_PARALLELISM,
        Some(SECRET_SIZE),
    )
    .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {}", e))?;

    let mut key = [0u8; SECRET_SIZE];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("failed to derive lock key: {}", e))?;
    Ok(Secret::from(key))
}

/// A peer identity: a public key plus its passphrase-locked private key
///
/// The public half is shared freely (published to bootstrap servers, fingerprinted
/// into a [`PeerId`]). The private half never leaves this struct unlocked, so a
/// `KeyPair` can be shared read-only between concurrent flows of the same peer.
///
/// # Examples
///
/// ```ignore
/// let pair = KeyPair::generate("correct horse")?;
/// let sealed = SealedMessage::seal(b"coordinates", pair.public())?;
/// let plaintext = pair.decrypt("correct horse", &sealed.to_pem())?;
/// ```
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    locked: LockedSecretKey,
}

impl KeyPair {
    /// Generate a fresh identity whose private key is locked under `passphrase`
    pub fn generate(passphrase: &str) -> Result<Self, IdentityError> {
        let secret = SecretKey::generate();
        Self::from_secret(&secret, passphrase)
    }

    /// Lock an existing private key into a key pair
    pub fn from_secret(secret: &SecretKey, passphrase: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            public: secret.public(),
            locked: LockedSecretKey::lock(secret, passphrase)?,
        })
    }

    /// Rebuild a key pair from its locked private key
    ///
    /// The passphrase is needed once to recompute the public half.
    pub fn from_locked(locked: LockedSecretKey, passphrase: &str) -> Result<Self, IdentityError> {
        let public = locked.unlock(passphrase)?.public();
        Ok(Self { public, locked })
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn locked(&self) -> &LockedSecretKey {
        &self.locked
    }

    pub fn peer_id(&self) -> PeerId {
        self.public.peer_id()
    }

    /// Unlock the private key for a short-lived operation
    pub fn unlock(&self, passphrase: &str) -> Result<SecretKey, IdentityError> {
        self.locked.unlock(passphrase)
    }

    /// Open an armored sealed message addressed to this identity
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Decryption`] if the passphrase is wrong, or the
    /// ciphertext is malformed, tampered with, or sealed to a different key.
    pub fn decrypt(&self, passphrase: &str, ciphertext: &str) -> Result<Vec<u8>, IdentityError> {
        let secret = self.unlock(passphrase)?;
        let sealed = SealedMessage::from_pem(ciphertext)?;
        Ok(sealed.open(&secret)?)
    }

    /// Prove possession of the private key behind [`Self::peer_id`]
    pub fn sign(
        &self,
        passphrase: &str,
        msg: &[u8],
    ) -> Result<ed25519_dalek::Signature, IdentityError> {
        Ok(self.unlock(passphrase)?.sign(msg))
    }
}
