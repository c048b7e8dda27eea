//! Client configuration loading and resolution.
//!
//! Values come from command-line overrides, then the optional TOML file, then
//! built-in defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tunelink_core::advance::{AdvancePolicy, LOOKAHEAD_SECONDS};
use tunelink_core::health::HealthPolicy;

use crate::event_stream::Backoff;

pub(crate) const DEFAULT_SERVER: &str = "http://localhost:8282";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Top-level client configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClientConfig {
    /// Backend base URL.
    pub(crate) server: Option<String>,
    /// Seconds before the end of a track at which to start the next one.
    pub(crate) lookahead_secs: Option<f64>,
    /// Per-request timeout for command calls.
    pub(crate) request_timeout_secs: Option<u64>,
    /// Startup reachability poll.
    pub(crate) health: Option<HealthConfig>,
    /// Event stream reconnect delays.
    pub(crate) reconnect: Option<ReconnectConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HealthConfig {
    pub(crate) attempts: Option<u32>,
    pub(crate) interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReconnectConfig {
    pub(crate) initial_ms: Option<u64>,
    pub(crate) max_ms: Option<u64>,
}

impl ClientConfig {
    /// Load configuration from disk.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ClientConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

/// Command-line values that win over the file.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) server: Option<String>,
    pub(crate) lookahead_secs: Option<f64>,
    pub(crate) health_attempts: Option<u32>,
}

/// Fully resolved runtime settings.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) server: String,
    pub(crate) policy: AdvancePolicy,
    pub(crate) health: HealthPolicy,
    pub(crate) reconnect: Backoff,
    pub(crate) request_timeout: Duration,
}

pub(crate) fn resolve(cfg: &ClientConfig, overrides: &Overrides) -> Result<Settings> {
    let server = overrides
        .server
        .clone()
        .or_else(|| cfg.server.clone())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let server = server.trim_end_matches('/').to_string();
    if !(server.starts_with("http://") || server.starts_with("https://")) {
        anyhow::bail!("server must be an http(s) URL, got {server:?}");
    }

    let lookahead = overrides
        .lookahead_secs
        .or(cfg.lookahead_secs)
        .unwrap_or(LOOKAHEAD_SECONDS);
    if !lookahead.is_finite() || lookahead < 0.0 {
        anyhow::bail!("lookahead_secs must be a non-negative number, got {lookahead}");
    }

    let defaults = HealthPolicy::default();
    let health_cfg = cfg.health.as_ref();
    let health = HealthPolicy {
        attempts: overrides
            .health_attempts
            .or(health_cfg.and_then(|h| h.attempts))
            .unwrap_or(defaults.attempts),
        interval: health_cfg
            .and_then(|h| h.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval),
    };
    if health.attempts == 0 {
        anyhow::bail!("health.attempts must be at least 1");
    }

    let backoff = Backoff::default();
    let reconnect_cfg = cfg.reconnect.as_ref();
    let reconnect = Backoff {
        initial: reconnect_cfg
            .and_then(|r| r.initial_ms)
            .map(Duration::from_millis)
            .unwrap_or(backoff.initial),
        max: reconnect_cfg
            .and_then(|r| r.max_ms)
            .map(Duration::from_millis)
            .unwrap_or(backoff.max),
    };
    if reconnect.initial > reconnect.max {
        anyhow::bail!("reconnect.initial_ms must not exceed reconnect.max_ms");
    }

    let request_timeout = Duration::from_secs(
        cfg.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    );

    Ok(Settings {
        server,
        policy: AdvancePolicy::new(lookahead),
        health,
        reconnect,
        request_timeout,
    })
}
