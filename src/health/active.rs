//! Active recovery probing.
//!
//! # Responsibilities
//! - Periodically probe penalized relays
//! - Clear penalties on relays that answer again
//!
//! Direct and unconfigured paths are never probed. Any answer below 500
//! counts as reachable; a relay refusing `OPTIONS` with 405 is still up.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RouterConfig;
use crate::health::state::HealthStore;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::paths::PathRegistry;
use crate::transport::Transport;

/// Background recovery prober.
#[derive(Clone)]
pub struct Prober<T: Transport> {
    registry: Arc<PathRegistry>,
    health: Arc<HealthStore>,
    transport: T,
    timeout: Duration,
    interval: Duration,
}

impl<T: Transport> Prober<T> {
    pub fn new(
        registry: Arc<PathRegistry>,
        health: Arc<HealthStore>,
        transport: T,
        config: &RouterConfig,
    ) -> Self {
        Self {
            registry,
            health,
            transport,
            timeout: config.timeouts.probe(),
            interval: Duration::from_secs(config.prober.interval_secs),
        }
    }

    /// Probe every penalized relay once. Returns how many recovered.
    pub async fn probe_once(&self) -> usize {
        let mut recovered = 0;

        for path in self.registry.paths().iter() {
            if !path.is_relay() || !self.health.is_penalized(path.name()) {
                continue;
            }
            let Some(url) = path.probe_url() else {
                continue;
            };

            match self.transport.probe(&url, self.timeout).await {
                Ok(status) if status < 500 => {
                    if self.health.clear_penalties(path.name()) {
                        recovered += 1;
                        metrics::record_probe_recovery(path.name());
                        tracing::info!(path = %path.name(), status, "Relay recovered");
                    }
                }
                Ok(status) => {
                    tracing::debug!(path = %path.name(), status, "Relay still failing");
                }
                Err(e) => {
                    tracing::debug!(path = %path.name(), error = %e, "Relay probe failed");
                }
            }
        }

        recovered
    }

    /// Probe on a fixed interval until `shutdown` fires.
    ///
    /// The first tick is delayed by one interval plus up to 10% jitter so
    /// that many clients started together do not probe in lockstep.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval_ms = self.interval.as_millis() as u64;
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=interval_ms / 10));

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Prober starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval + jitter, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let recovered = self.probe_once().await;
                    if recovered > 0 {
                        tracing::info!(recovered, "Probe pass finished");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run in a background task.
    pub fn spawn(self) -> ProberHandle {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(self.run(shutdown.subscribe()));
        ProberHandle { shutdown, task }
    }
}

/// Handle to a running prober task.
pub struct ProberHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl ProberHandle {
    /// Signal the task and wait for it to exit.
    pub async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Prober task ended abnormally");
        }
    }
}
