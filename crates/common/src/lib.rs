/**
 * HTTP contract of a bootstrap server:
 *  request types, routes and a thin client.
 */
pub mod api;
/**
 * Blob store abstractions and the client side
 *  of the store / fetch protocol.
 */
pub mod blob;
/**
 * Cryptographic types and operations.
 *  - Ed25519 identities and peer ids
 *  - Passphrase-locked private keys
 *  - Payloads sealed to a public key
 */
pub mod crypto;
/**
 * Hand-off queue between producers and
 *  consumers that may not have arrived yet.
 */
pub mod rendezvous;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::blob::{
        BlobError, BlobSource, BlobStore, BlobStoreDetails, ByteStream, BytesSource, FileSource,
        ProgressReporter, RemoteBlobStore, ShareAddress,
    };
    pub use crate::crypto::{KeyPair, PeerId, PublicKey, SecretKey};
    pub use crate::rendezvous::{Cancelled, RendezvousQueue};
    pub use crate::version::build_info;
}
