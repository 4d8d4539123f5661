use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CloseReason, DeliveryError};

/// Opaque connection identity. UUIDv7, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct ConnectionInner {
    id: ConnId,
    remote: Option<SocketAddr>,
    tx: mpsc::Sender<Message>,
    deadline: Mutex<Instant>,
    closing: CancellationToken,
    reason: OnceLock<CloseReason>,
}

/// Shared handle to one open duplex channel.
///
/// Cloning is cheap. The outbound side is a bounded FIFO drained by the
/// connection's writer task, so enqueueing never waits on the network.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiving end of its outbound queue.
    pub fn new(remote: Option<SocketAddr>, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self {
            inner: Arc::new(ConnectionInner {
                id: ConnId::new(),
                remote,
                tx,
                deadline: Mutex::new(Instant::now()),
                closing: CancellationToken::new(),
                reason: OnceLock::new(),
            }),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnId {
        self.inner.id
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.inner.remote
    }

    /// Enqueue a frame without waiting.
    pub fn send(&self, msg: Message) -> Result<(), DeliveryError> {
        if self.is_closing() {
            return Err(DeliveryError::Closed);
        }
        self.inner.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Instant past which a silent connection is considered dead.
    pub fn deadline(&self) -> Instant {
        *self.inner.deadline.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn extend_deadline(&self, extension: Duration) {
        let mut deadline = self.inner.deadline.lock().unwrap_or_else(|e| e.into_inner());
        *deadline = Instant::now() + extension;
    }

    /// Ask the connection task to wind down. Only the first reason sticks.
    pub fn close(&self, reason: CloseReason) {
        let _ = self.inner.reason.set(reason);
        self.inner.closing.cancel();
    }

    pub fn is_closing(&self) -> bool {
        self.inner.closing.is_cancelled()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.inner.reason.get().cloned()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closing(&self) {
        self.inner.closing.cancelled().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("remote", &self.inner.remote)
            .field("closing", &self.is_closing())
            .finish()
    }
}
