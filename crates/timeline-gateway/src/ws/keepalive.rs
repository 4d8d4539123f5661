use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CloseReason, DeliveryError};
use crate::ws::hub::BroadcastHub;

/// Periodically pings every registered connection.
///
/// It never closes anything on its own account; a connection that stops
/// answering runs past its liveness deadline and its own task closes it.
pub struct KeepaliveScheduler {
    hub: Arc<BroadcastHub>,
    ping_interval: Duration,
}

impl KeepaliveScheduler {
    pub fn new(hub: Arc<BroadcastHub>, ping_interval: Duration) -> Self {
        Self { hub, ping_interval }
    }

    /// Ping every connection in a registry snapshot. Returns how many pings were queued.
    pub fn tick(&self) -> usize {
        let mut sent = 0;
        for conn in self.hub.registry().snapshot() {
            match conn.send(Message::Ping(Default::default())) {
                Ok(()) => sent += 1,
                Err(DeliveryError::Full) => {
                    warn!(conn_id = %conn.id(), "outbound queue full at ping, dropping slow consumer");
                    conn.close(CloseReason::SlowConsumer);
                }
                Err(DeliveryError::Closed) => {}
            }
        }
        sent
    }

    /// Tick every `ping_interval` until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_ms = self.ping_interval.as_millis() as u64, "keepalive started");

        // first ping one full interval after start
        let mut interval = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("keepalive shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let sent = self.tick();
                    debug!(pinged = sent, "keepalive tick");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::ws::handle::ConnectionHandle;

    fn pings(rx: &mut mpsc::Receiver<Message>) -> usize {
        let mut n = 0;
        while let Ok(msg) = rx.try_recv() {
            if matches!(msg, Message::Ping(_)) {
                n += 1;
            }
        }
        n
    }

    #[tokio::test]
    async fn one_tick_pings_each_open_connection_once() {
        let hub = Arc::new(BroadcastHub::new(Duration::from_secs(3)));
        let mut receivers = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let (h, rx) = ConnectionHandle::new(None, 8);
            hub.on_open(&h);
            handles.push(h);
            receivers.push(rx);
        }
        hub.on_close(&handles[1], &CloseReason::ClientClosed);

        let keepalive = KeepaliveScheduler::new(Arc::clone(&hub), Duration::from_secs(1));
        assert_eq!(keepalive.tick(), 3);

        let counts: Vec<usize> = receivers.iter_mut().map(pings).collect();
        assert_eq!(counts, vec![1, 0, 1, 1]);
    }

    #[tokio::test]
    async fn empty_registry_pings_nobody() {
        let hub = Arc::new(BroadcastHub::new(Duration::from_secs(3)));
        let keepalive = KeepaliveScheduler::new(hub, Duration::from_secs(1));
        assert_eq!(keepalive.tick(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_on_period_and_stops_on_cancel() {
        let hub = Arc::new(BroadcastHub::new(Duration::from_secs(3)));
        let (h, mut rx) = ConnectionHandle::new(None, 16);
        hub.on_open(&h);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            KeepaliveScheduler::new(Arc::clone(&hub), Duration::from_secs(1)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(pings(&mut rx), 3);

        shutdown.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(pings(&mut rx), 0);
    }
}
