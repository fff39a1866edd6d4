//! Blob store abstractions and the client side of the bootstrap protocol
//!
//! A [`BlobSource`] produces the bytes, a [`BlobStore`] takes them and hands
//! back [`BlobStoreDetails`]: the content hash plus a per-upload secret. The
//! pair is what a [`ShareAddress`] encodes and what a server demands before
//! serving the blob back.

mod address;
mod client;
mod details;
mod error;
mod progress;
mod source;
mod store;

pub use address::{AddressError, ShareAddress};
pub use client::{FlowIdentity, RemoteBlobStore, StoreFlow, StoreFlowState};
pub use details::{
    BlobHash, BlobSecret, BlobStoreDetails, DetailsError, BLOB_HASH_SIZE, BLOB_SECRET_SIZE,
};
pub use error::BlobError;
pub use progress::{ProgressReporter, TransferProgress};
pub use source::{BlobSource, ByteStream, BytesSource, FileSource, CHUNK_SIZE};
pub use store::{until_cancelled, BlobStore};
