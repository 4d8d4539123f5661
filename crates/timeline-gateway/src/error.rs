use axum::extract::ws::CloseFrame;
use thiserror::Error;

/// Why a connection left the `Open` state. The first reason recorded wins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloseReason {
    #[error("client closed")]
    ClientClosed,

    #[error("no frame or pong within {after_ms}ms")]
    LivenessTimeout { after_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("outbound queue full")]
    SlowConsumer,

    #[error("server shutting down")]
    Shutdown,
}

impl CloseReason {
    /// Close frame the server sends on its way out, if any.
    ///
    /// Client-initiated closes are answered by the transport itself and a
    /// broken transport cannot carry a frame.
    pub fn close_frame(&self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            CloseReason::ClientClosed | CloseReason::Transport(_) => return None,
            CloseReason::LivenessTimeout { .. } => (1001, "liveness timeout"),
            CloseReason::SlowConsumer => (1008, "slow consumer"),
            CloseReason::Shutdown => (1001, "server shutting down"),
        };
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }
}

/// Why an enqueue onto a connection's outbound queue failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Full,

    #[error("connection closed")]
    Closed,
}
