// src/health/scheduler.rs
use super::checker::HealthMonitor;
use crate::config::BackendConfig;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::info;

/// Drives a [`HealthMonitor`]: one startup pass, then a pass every `period`.
///
/// Ticks are fixed-delay; a slow pass pushes the next one back instead of
/// bunching passes together, so a record is never checked concurrently
/// with itself.
pub struct HealthScheduler {
    monitor: Arc<HealthMonitor>,
    period: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HealthScheduler {
    pub fn new(monitor: Arc<HealthMonitor>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            monitor,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(self: Arc<Self>, backends: Vec<BackendConfig>) {
        let mut shutdown_rx = self.shutdown_rx.clone();
        if *shutdown_rx.borrow() {
            return;
        }

        self.monitor.on_startup(&backends).await;

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting health scheduler with interval: {:?}", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.monitor.on_tick().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Health scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
