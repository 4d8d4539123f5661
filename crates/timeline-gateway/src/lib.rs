//! `timeline-gateway`: WebSocket broadcast hub for a shared timeline.
//!
//! Clients connect to `/ws`, send JSON mutation envelopes, and receive every
//! frame any client sends (their own included) in the order the hub applied
//! them. A keepalive task pings all connections; a connection silent past
//! its liveness deadline is closed and deregistered.

pub mod app;
pub mod error;
pub mod http;
pub mod shutdown;
pub mod ws;

pub use app::{build_router, serve, AppState};
