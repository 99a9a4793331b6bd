use crate::network::{Connection, ConnectionId};
use shared::types::PeerId;
use std::collections::BTreeMap;

struct Entry<C> {
    connection: C,
    peer_id: PeerId,
}

/// Live connections, in registration order.
pub struct ConnectionRegistry<C> {
    entries: BTreeMap<ConnectionId, Entry<C>>,
}

impl<C: Connection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns `false` when the connection was already registered.
    pub fn register(&mut self, connection: C, peer_id: PeerId) -> bool {
        let id = connection.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, Entry { connection, peer_id });
        true
    }

    pub fn unregister(&mut self, id: ConnectionId) -> Option<PeerId> {
        self.entries.remove(&id).map(|entry| entry.peer_id)
    }

    /// Snapshot of every live connection.
    pub fn all(&self) -> Vec<C> {
        self.entries.values().map(|entry| entry.connection.clone()).collect()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&C> {
        self.entries.get(&id).map(|entry| &entry.connection)
    }

    pub fn peer_id(&self, id: ConnectionId) -> Option<&PeerId> {
        self.entries.get(&id).map(|entry| &entry.peer_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
