use std::sync::Arc;

use crate::registry::KeyRegistry;
use crate::vault::BlobVault;

/// Shared state behind every handler
#[derive(Debug, Clone, Default)]
pub struct ServerState(Arc<Inner>);

#[derive(Debug, Default)]
struct Inner {
    keys: KeyRegistry,
    blobs: BlobVault,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.0.keys
    }

    pub fn blobs(&self) -> &BlobVault {
        &self.0.blobs
    }
}
