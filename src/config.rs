//! Configuration module

use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STALE_THRESHOLD_SECS: u64 = 90;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
const DEFAULT_ALERT_BUFFER_CAPACITY: usize = 10_000;
const DEFAULT_HEATMAP_TOP: usize = 10;
const DEFAULT_OFFLINE_CAPACITY: usize = crate::fleet::registry::DEFAULT_OFFLINE_CAPACITY;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// An online instance whose last heartbeat is older than this is marked stale
    pub stale_threshold: Duration,

    /// How often the staleness sweeper runs
    pub sweep_interval: Duration,

    /// Maximum number of normalized alerts held for aggregation
    pub alert_buffer_capacity: usize,

    /// Heatmap entries returned when the caller does not pass `top`
    pub heatmap_top_default: usize,

    /// How many removed instance ids are remembered for the offline count
    pub offline_capacity: usize,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            stale_threshold: Duration::from_secs(DEFAULT_STALE_THRESHOLD_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            alert_buffer_capacity: DEFAULT_ALERT_BUFFER_CAPACITY,
            heatmap_top_default: DEFAULT_HEATMAP_TOP,
            offline_capacity: DEFAULT_OFFLINE_CAPACITY,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),

            environment: lookup("ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),

            stale_threshold: Duration::from_secs(
                parsed("STALE_THRESHOLD_SECS").unwrap_or(DEFAULT_STALE_THRESHOLD_SECS),
            ),

            // tokio::time::interval panics on a zero period
            sweep_interval: Duration::from_secs(
                parsed("SWEEP_INTERVAL_SECS")
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS)
                    .max(1),
            ),

            alert_buffer_capacity: parsed("ALERT_BUFFER_CAPACITY")
                .map(|c| c as usize)
                .filter(|c| *c > 0)
                .unwrap_or(DEFAULT_ALERT_BUFFER_CAPACITY),

            heatmap_top_default: parsed("HEATMAP_TOP_DEFAULT")
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_HEATMAP_TOP),

            offline_capacity: parsed("OFFLINE_MEMORY_CAPACITY")
                .map(|c| c as usize)
                .unwrap_or(DEFAULT_OFFLINE_CAPACITY),

            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}
