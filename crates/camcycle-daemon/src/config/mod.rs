//! Daemon configuration: environment first, CLI flags override.

use std::time::Duration;

use camcycle::types::FeedDefaults;

/// Port the REST/SSE surface binds by default.
pub const DEFAULT_HTTP_PORT: u16 = 8750;

const DEFAULT_SNAPSHOT_REFRESH_MS: u64 = 750;
const DEFAULT_ROTATE_SECS: u64 = 20;
const DEFAULT_LIST_REFRESH_SECS: u64 = 3600;
const DEFAULT_SNAPSHOT_RETRY_LIMIT: u32 = 3;
const DEFAULT_SNAPSHOT_RETRY_DELAY_SECS: u64 = 2;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STARTUP_RETRY_DELAY_SECS: u64 = 30;

/// Runtime configuration for the slideshow daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feed source URLs, tried in order.
    pub sources: Vec<String>,
    /// Port for the REST/SSE surface.
    pub http_port: u16,
    /// How often the current camera's snapshot is re-fetched.
    pub snapshot_refresh: Duration,
    /// How long each camera stays on screen before rotating.
    pub rotate_every: Duration,
    /// How often the camera list is re-acquired.
    pub list_refresh_every: Duration,
    /// Snapshot failures tolerated before skipping to the next camera.
    pub snapshot_retry_limit: u32,
    /// Fixed delay between snapshot retries for the same camera.
    pub snapshot_retry_delay: Duration,
    /// Per-request timeout for feed and snapshot fetches.
    pub fetch_timeout: Duration,
    /// Delay between startup acquisition attempts while the feed is down.
    pub startup_retry_delay: Duration,
    /// Backfill values for records with missing metadata.
    pub defaults: FeedDefaults,
}

impl Config {
    /// Build a configuration from `CAMCYCLE_*` environment variables, falling
    /// back to the defaults above.
    pub fn from_env() -> Self {
        let mut defaults = FeedDefaults::default();
        if let Some(owner) = read_env_string("CAMCYCLE_DEFAULT_OWNER") {
            defaults.owner = owner;
        }
        if let Some(homepage) = read_env_string("CAMCYCLE_DEFAULT_HOMEPAGE") {
            defaults.homepage = homepage;
        }

        Self {
            sources: read_env_string("CAMCYCLE_SOURCES")
                .map(|raw| parse_sources(&raw))
                .unwrap_or_default(),
            http_port: read_env_u16("CAMCYCLE_HTTP_PORT", DEFAULT_HTTP_PORT),
            snapshot_refresh: Duration::from_millis(read_env_u64(
                "CAMCYCLE_SNAPSHOT_REFRESH_MS",
                DEFAULT_SNAPSHOT_REFRESH_MS,
            )),
            rotate_every: Duration::from_secs(read_env_u64(
                "CAMCYCLE_ROTATE_SECS",
                DEFAULT_ROTATE_SECS,
            )),
            list_refresh_every: Duration::from_secs(read_env_u64(
                "CAMCYCLE_LIST_REFRESH_SECS",
                DEFAULT_LIST_REFRESH_SECS,
            )),
            snapshot_retry_limit: read_env_u32(
                "CAMCYCLE_SNAPSHOT_RETRY_LIMIT",
                DEFAULT_SNAPSHOT_RETRY_LIMIT,
            )
            .max(1),
            snapshot_retry_delay: Duration::from_secs(read_env_u64(
                "CAMCYCLE_SNAPSHOT_RETRY_DELAY_SECS",
                DEFAULT_SNAPSHOT_RETRY_DELAY_SECS,
            )),
            fetch_timeout: Duration::from_secs(read_env_u64(
                "CAMCYCLE_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            )),
            startup_retry_delay: Duration::from_secs(read_env_u64(
                "CAMCYCLE_STARTUP_RETRY_DELAY_SECS",
                DEFAULT_STARTUP_RETRY_DELAY_SECS,
            )),
            defaults,
        }
    }
}

/// Split a comma-separated source list, trimming entries and dropping blanks.
pub fn parse_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u32(name: &str, default_value: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn read_env_u16(name: &str, default_value: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default_value)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string())
}
