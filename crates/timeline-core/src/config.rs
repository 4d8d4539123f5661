use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_CONFIG_FILE: &str = "timeline.toml";
pub const WS_PATH: &str = "/ws";
pub const MAX_PAYLOAD_BYTES: usize = 128 * 1024; // 128 KB hard cap per frame
pub const PING_INTERVAL_MS: u64 = 10_000;
pub const DEADLINE_EXTENSION_MS: u64 = 30_000; // must stay above PING_INTERVAL_MS
pub const SHUTDOWN_GRACE_MS: u64 = 5_000;
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Top-level config (timeline.toml + TIMELINE_* env overrides).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    #[serde(default)]
    pub outbound: OutboundConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Inbound frames above this size fail the connection that sent them.
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

/// Ping cadence and the liveness window granted after every received frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,
    #[serde(default = "default_deadline_extension")]
    pub deadline_extension_ms: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: PING_INTERVAL_MS,
            deadline_extension_ms: DEADLINE_EXTENSION_MS,
        }
    }
}

impl KeepaliveConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn deadline_extension(&self) -> Duration {
        Duration::from_millis(self.deadline_extension_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long open connections get to drain after the close broadcast.
    #[serde(default = "default_grace")]
    pub grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: SHUTDOWN_GRACE_MS,
        }
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// Per-connection queue depth; a full queue marks the client as a slow consumer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            queue_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_payload() -> usize {
    MAX_PAYLOAD_BYTES
}
fn default_ping_interval() -> u64 {
    PING_INTERVAL_MS
}
fn default_deadline_extension() -> u64 {
    DEADLINE_EXTENSION_MS
}
fn default_grace() -> u64 {
    SHUTDOWN_GRACE_MS
}
fn default_queue_capacity() -> usize {
    OUTBOUND_QUEUE_CAPACITY
}

impl HubConfig {
    /// Load config from a TOML file with TIMELINE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `TIMELINE_CONFIG` env var
    ///   3. ./timeline.toml
    ///
    /// A missing file is fine; every field has a default.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("TIMELINE_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("TIMELINE_").split("__")),
        )
    }

    /// Extract and validate from an already assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: HubConfig = figment
            .extract()
            .map_err(|e| TimelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ka = &self.keepalive;
        if ka.ping_interval_ms == 0 {
            return Err(TimelineError::Config(
                "keepalive.ping_interval_ms must be non-zero".to_string(),
            ));
        }
        if ka.deadline_extension_ms <= ka.ping_interval_ms {
            return Err(TimelineError::Config(format!(
                "keepalive.deadline_extension_ms ({}) must exceed ping_interval_ms ({})",
                ka.deadline_extension_ms, ka.ping_interval_ms
            )));
        }
        if self.outbound.queue_capacity == 0 {
            return Err(TimelineError::Config(
                "outbound.queue_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `bind:port` as given in config, not yet resolved.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.gateway.bind, self.gateway.port)
    }
}
