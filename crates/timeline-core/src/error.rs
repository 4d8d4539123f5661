use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl TimelineError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            TimelineError::Config(_) => "CONFIG_ERROR",
            TimelineError::Bind { .. } => "BIND_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;
