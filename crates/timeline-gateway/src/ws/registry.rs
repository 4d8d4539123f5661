use dashmap::DashMap;
use tracing::debug;

use crate::ws::handle::{ConnId, ConnectionHandle};

/// Live set of open connections, keyed by [`ConnId`].
///
/// Membership mirrors the `Open` state exactly: the connection task adds its
/// handle right after upgrade and removes it once on the way out.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handle. Re-adding a present id keeps the original entry.
    pub fn add(&self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        let mut inserted = false;
        self.connections.entry(id).or_insert_with(|| {
            inserted = true;
            handle
        });
        if inserted {
            debug!(conn_id = %id, connections = self.count(), "connection registered");
        }
        inserted
    }

    /// Remove a handle. Removing an absent id is a no-op.
    pub fn remove(&self, id: &ConnId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            debug!(conn_id = %id, connections = self.count(), "connection unregistered");
        }
        removed
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.connections.contains_key(id)
    }

    /// Clone out every handle so callers can fan out without holding shard locks.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }
}
