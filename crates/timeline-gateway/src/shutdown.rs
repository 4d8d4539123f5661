//! Process shutdown: wait for a signal, then give open connections a bounded
//! grace period to flush before the runtime drops whatever is left.

use std::time::Duration;

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

/// Cancel `token` on Ctrl-C (and SIGTERM on unix).
pub async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = token.cancelled() => return,
    }

    info!("shutdown signal received");
    token.cancel();
}

/// Wait up to `grace` for every connection task to finish.
///
/// Connection tasks react to the shutdown token themselves and flush their
/// queues before exiting; this only bounds how long the process waits for
/// them. Returns how many were still running when the grace period ran out.
pub async fn drain(connections: &TaskTracker, grace: Duration) -> usize {
    connections.close();
    let open = connections.len();
    if open == 0 {
        info!("no open connections to drain");
        return 0;
    }

    info!(connections = open, grace_ms = grace.as_millis() as u64, "draining connections");
    match tokio::time::timeout(grace, connections.wait()).await {
        Ok(()) => {
            info!("all connections closed");
            0
        }
        Err(_) => {
            let left = connections.len();
            warn!(connections = left, "grace period elapsed, force-closing remaining connections");
            left
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use axum::extract::ws::Message;

    use super::*;
    use crate::error::CloseReason;
    use crate::ws::{BroadcastHub, ConnectionHandle};

    #[tokio::test]
    async fn drain_returns_immediately_when_empty() {
        let connections = TaskTracker::new();
        assert_eq!(drain(&connections, Duration::from_secs(60)).await, 0);
        assert!(connections.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_reports_stragglers_after_grace() {
        let connections = TaskTracker::new();
        let _stuck = connections.spawn(std::future::pending::<()>());

        assert_eq!(drain(&connections, Duration::from_secs(5)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_the_flush_after_deregistration() {
        let hub = Arc::new(BroadcastHub::new(Duration::from_secs(3)));
        let connections = TaskTracker::new();
        let (conn, mut rx) = ConnectionHandle::new(None, 8);
        hub.on_open(&conn);
        conn.send(Message::Text("queued".into())).unwrap();

        let flushed = Arc::new(AtomicBool::new(false));
        connections.spawn({
            let hub = Arc::clone(&hub);
            let flushed = Arc::clone(&flushed);
            async move {
                // deregister first, then take a while to write out the queue
                hub.on_close(&conn, &CloseReason::Shutdown);
                tokio::time::sleep(Duration::from_secs(1)).await;
                assert!(rx.recv().await.is_some());
                flushed.store(true, Ordering::SeqCst);
            }
        });

        assert_eq!(drain(&connections, Duration::from_secs(5)).await, 0);
        assert!(flushed.load(Ordering::SeqCst));
        assert_eq!(hub.registry().count(), 0);
    }

    #[tokio::test]
    async fn signal_listener_exits_when_token_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), cancel_on_signal(token))
            .await
            .expect("listener should return");
    }
}
