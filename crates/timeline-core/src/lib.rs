//! Shared configuration, constants and error type for the timeline hub.

pub mod config;
pub mod error;

pub use config::HubConfig;
pub use error::{Result, TimelineError};
