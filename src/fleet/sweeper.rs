//! Staleness Sweeper
//!
//! Background job that marks online instances stale once their heartbeat has
//! lapsed. It never removes records; a later heartbeat brings them back online.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use super::registry::FleetRegistry;

pub struct StalenessSweeper {
    registry: Arc<FleetRegistry>,
    stale_threshold: Duration,
    interval: Duration,
}

impl StalenessSweeper {
    pub fn new(registry: Arc<FleetRegistry>, stale_threshold: Duration, interval: Duration) -> Self {
        Self {
            registry,
            stale_threshold,
            // tokio::time::interval panics on zero
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(registry: Arc<FleetRegistry>, config: &Config) -> Self {
        Self::new(registry, config.stale_threshold, config.sweep_interval)
    }

    /// Run one pass. Returns the ids that were marked stale.
    pub fn sweep_once(&self) -> Vec<String> {
        // Candidates come from a snapshot; the registry checks status and idle
        // time under its lock so a heartbeat in between is not overwritten.
        self.registry
            .get_all()
            .into_iter()
            .filter(|r| self.registry.mark_stale_if_idle(&r.instance_id, self.stale_threshold))
            .map(|r| r.instance_id)
            .collect()
    }

    /// Sweep forever on the configured interval
    pub async fn run(self) {
        tracing::info!(
            "Staleness sweeper started (threshold {}s, every {}s)",
            self.stale_threshold.as_secs(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let marked = self.sweep_once();
            if !marked.is_empty() {
                tracing::info!("Marked {} instance(s) stale: {:?}", marked.len(), marked);
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
