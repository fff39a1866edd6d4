use std::collections::HashMap;

use parking_lot::RwLock;

use common::crypto::{PeerId, PublicKey};

/// Public keys of every peer that has introduced itself, by peer id
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: RwLock<HashMap<PeerId, PublicKey>>,
}

impl KeyRegistry {
    /// Record `key` under its peer id. Registering the same key twice is a no-op.
    pub fn register(&self, key: PublicKey) -> PeerId {
        let peer_id = key.peer_id();
        let fresh = self.keys.write().insert(peer_id, key).is_none();
        if fresh {
            tracing::info!(%peer_id, "registered peer");
        } else {
            tracing::debug!(%peer_id, "peer re-registered");
        }
        peer_id
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<PublicKey> {
        self.keys.read().get(peer_id).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod test {
    use common::crypto::SecretKey;

    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = KeyRegistry::default();
        let key = SecretKey::generate().public();

        let peer_id = registry.register(key);
        assert_eq!(peer_id, key.peer_id());
        assert_eq!(registry.get(&peer_id), Some(key));

        registry.register(key);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_peer() {
        let registry = KeyRegistry::default();
        let stranger = SecretKey::generate().public().peer_id();
        assert!(registry.get(&stranger).is_none());
        assert!(registry.is_empty());
    }
}
