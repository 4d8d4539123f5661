use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use timeline_core::config::{HubConfig, WS_PATH};
use tokio::net::TcpListener;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::info;

use crate::ws::{BroadcastHub, KeepaliveScheduler};

/// Shared state handed to every Axum handler as `Arc<AppState>`.
pub struct AppState {
    pub config: HubConfig,
    pub hub: Arc<BroadcastHub>,
    /// Cancelled once on shutdown; every connection task and the keepalive loop watch it.
    pub shutdown: CancellationToken,
    /// One tracked task per upgraded connection, writer flush included.
    pub connections: TaskTracker,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: HubConfig) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.keepalive.deadline_extension()));
        Self {
            config,
            hub,
            shutdown: CancellationToken::new(),
            connections: TaskTracker::new(),
            started_at: Utc::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/timelines", get(crate::http::timelines::list_handler))
        .route(WS_PATH, get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve on `listener` until `state.shutdown` is cancelled, then drain.
///
/// The keepalive loop runs for exactly as long as the server does. On return
/// every connection task has finished, or the grace period ran out.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let keepalive = KeepaliveScheduler::new(
        Arc::clone(&state.hub),
        state.config.keepalive.ping_interval(),
    );
    let keepalive_task = tokio::spawn(keepalive.run(state.shutdown.clone()));

    info!(addr = %listener.local_addr()?, "timeline gateway listening");

    let router = build_router(Arc::clone(&state));
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(state.shutdown.clone().cancelled_owned())
    .await?;

    let _ = keepalive_task.await;
    crate::shutdown::drain(&state.connections, state.config.shutdown.grace()).await;
    Ok(())
}
