pub mod connection;
pub mod handle;
pub mod hub;
pub mod keepalive;
pub mod registry;

pub use handle::{ConnId, ConnectionHandle};
pub use hub::BroadcastHub;
pub use keepalive::KeepaliveScheduler;
pub use registry::ConnectionRegistry;
