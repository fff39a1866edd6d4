//! Cryptographic primitives for blobdrop
//!
//! - **Identity**: Ed25519 keypairs; a peer is addressed by the SHA-256
//!   fingerprint of its public key ([`PeerId`])
//! - **Locking**: private keys are kept encrypted under a passphrase ([`KeyPair`])
//! - **Sealing**: payloads encrypted to a public key via X25519 ECDH +
//!   ChaCha20-Poly1305 ([`SealedMessage`])
//!
//! # Security Model
//!
//! A bootstrap server learns a peer's public key and the blobs it uploads. It
//! returns each blob's retrieval coordinates sealed to the uploader's key, so the
//! retrieval secret is only ever readable by the uploader (and whoever the
//! uploader later shares the address with).

mod identity;
mod keys;
mod peer_id;
mod sealed;
mod secret;

pub use ed25519_dalek::Signature;
pub use identity::{IdentityError, KeyPair, LockedSecretKey};
pub use keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
pub use peer_id::{PeerId, PEER_ID_SIZE};
pub use sealed::{SealError, SealedMessage};
pub use secret::{Secret, SecretError};
