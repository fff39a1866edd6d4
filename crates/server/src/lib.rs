//! Reference bootstrap server for blobdrop
//!
//! Peers register a public key, upload blobs under the resulting peer id and
//! get the retrieval coordinates back sealed to that key. Anyone presenting a
//! blob's hash together with one of its secrets can download it.

pub mod config;
pub mod http_server;
pub mod process;
pub mod registry;
pub mod state;
pub mod vault;

pub use config::Config;
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use state::ServerState;
