use std::sync::Mutex;
use std::time::Duration;

use axum::extract::ws::Message;
use timeline_protocol::{MutationEnvelope, TimelineEntry};
use timeline_store::{MessageStore, StoreError};
use tracing::{debug, info, warn};

use crate::error::{CloseReason, DeliveryError};
use crate::ws::handle::ConnectionHandle;
use crate::ws::registry::ConnectionRegistry;

/// Applies inbound mutations to the shared store and relays every frame to
/// every open connection.
///
/// The store mutex also covers the fan-out enqueue, so all connections see
/// frames in exactly the order the store applied them. Enqueueing is a
/// non-blocking push onto each connection's bounded queue; socket writes
/// happen in the per-connection writer tasks, outside the lock.
pub struct BroadcastHub {
    store: Mutex<MessageStore>,
    registry: ConnectionRegistry,
    deadline_extension: Duration,
}

impl BroadcastHub {
    pub fn new(deadline_extension: Duration) -> Self {
        Self {
            store: Mutex::new(MessageStore::new()),
            registry: ConnectionRegistry::new(),
            deadline_extension,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn deadline_extension(&self) -> Duration {
        self.deadline_extension
    }

    /// Connection entered `Open`: arm its liveness deadline and register it.
    pub fn on_open(&self, conn: &ConnectionHandle) {
        conn.extend_deadline(self.deadline_extension);
        self.registry.add(conn.clone());
        info!(
            conn_id = %conn.id(),
            remote = ?conn.remote(),
            connections = self.registry.count(),
            "connection opened"
        );
    }

    /// Apply `frame` if it parses as a mutation, then relay it verbatim to
    /// every registered connection, the sender included.
    ///
    /// Returns how many connections the frame was queued for.
    pub fn on_message(&self, conn: &ConnectionHandle, frame: Message) -> usize {
        let parsed = match &frame {
            Message::Text(text) => MutationEnvelope::parse(text.as_str().as_bytes()),
            Message::Binary(bytes) => MutationEnvelope::parse(bytes),
            _ => return 0,
        };

        let relayed = {
            let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            match parsed {
                Ok(envelope) => match store.apply(&envelope) {
                    Ok(applied) => {
                        debug!(conn_id = %conn.id(), id = envelope.id, ?applied, "mutation applied")
                    }
                    Err(StoreError::NotFound { id }) => {
                        debug!(conn_id = %conn.id(), id, "delete for unknown id ignored")
                    }
                },
                Err(e) => {
                    debug!(conn_id = %conn.id(), error = %e, "unparseable frame relayed without apply")
                }
            }
            self.relay(&frame)
        };

        conn.extend_deadline(self.deadline_extension);
        relayed
    }

    /// Pong (or any control frame) received: keep the connection alive.
    pub fn on_pong(&self, conn: &ConnectionHandle) {
        conn.extend_deadline(self.deadline_extension);
    }

    /// Connection left `Open`. Called exactly once per connection.
    pub fn on_close(&self, conn: &ConnectionHandle, reason: &CloseReason) {
        conn.close(reason.clone());
        self.registry.remove(&conn.id());
        info!(
            conn_id = %conn.id(),
            remote = ?conn.remote(),
            %reason,
            connections = self.registry.count(),
            "connection closed"
        );
    }

    /// Ordered copy of the current store contents.
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries()
            .to_vec()
    }

    pub fn entry_count(&self) -> usize {
        self.store.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn relay(&self, frame: &Message) -> usize {
        let mut queued = 0;
        for target in self.registry.snapshot() {
            match target.send(frame.clone()) {
                Ok(()) => queued += 1,
                Err(DeliveryError::Full) => {
                    warn!(conn_id = %target.id(), "outbound queue full, dropping slow consumer");
                    target.close(CloseReason::SlowConsumer);
                }
                // already on its way out; its task deregisters it
                Err(DeliveryError::Closed) => {}
            }
        }
        queued
    }
}
