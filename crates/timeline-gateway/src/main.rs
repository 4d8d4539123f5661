use std::sync::Arc;

use clap::Parser;
use timeline_core::{HubConfig, TimelineError};
use tracing::{error, info};

use timeline_gateway::{shutdown, AppState};

/// Real-time collaborative timeline hub.
#[derive(Debug, Parser)]
#[command(name = "timeline-gateway", version, about)]
struct Cli {
    /// Path to timeline.toml (falls back to TIMELINE_CONFIG, then ./timeline.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override gateway.bind
    #[arg(long)]
    bind: Option<String>,

    /// Override gateway.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timeline_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = HubConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        HubConfig::default()
    });
    if let Some(bind) = cli.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    info!(
        ping_interval_ms = config.keepalive.ping_interval_ms,
        deadline_extension_ms = config.keepalive.deadline_extension_ms,
        grace_ms = config.shutdown.grace_ms,
        "keepalive configured"
    );

    let addr = config.listen_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(source) => {
            let err = TimelineError::Bind { addr, source };
            error!(code = err.code(), "{err}");
            return Err(err.into());
        }
    };

    let state = Arc::new(AppState::new(config));
    tokio::spawn(shutdown::cancel_on_signal(state.shutdown.clone()));

    timeline_gateway::serve(listener, state).await?;
    info!("timeline gateway stopped");
    Ok(())
}
