// src/config/tracker.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::event_log::DEFAULT_LOG_CAPACITY;
use crate::feed::fetch::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::feed::FEED_URL;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TRACKER_CONFIG_PATH: &str = "config/tracker.toml";

pub const ENV_TRACKER_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const ENV_FEED_URL: &str = "FEED_URL";

fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_feed_url() -> String {
    FEED_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_interval(),
            feed_url: default_feed_url(),
            request_timeout_secs: default_timeout(),
            log_capacity: default_capacity(),
            user_agent: default_user_agent(),
        }
    }
}

impl TrackerConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        let cfg: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("parsing tracker config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $TRACKER_CONFIG_PATH (must exist)
    /// 2) config/tracker.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_TRACKER_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("TRACKER_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_TRACKER_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    /// `POLL_INTERVAL_SECS` and `FEED_URL` win over the file.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(raw) = std::env::var(ENV_POLL_INTERVAL_SECS) {
            self.poll_interval_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_POLL_INTERVAL_SECS} must be whole seconds, got {raw:?}"))?;
        }
        if let Ok(url) = std::env::var(ENV_FEED_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.feed_url = url.to_string();
            }
        }
        Ok(self.sanitized())
    }

    // zero is never meaningful for these; fall back to defaults
    fn sanitized(mut self) -> Self {
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = DEFAULT_POLL_INTERVAL_SECS;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if self.log_capacity == 0 {
            self.log_capacity = DEFAULT_LOG_CAPACITY;
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: TrackerConfig = toml::from_str("poll_interval_secs = 30").unwrap();
        assert_eq!(cfg.poll_interval_secs, 30);
        assert_eq!(cfg.feed_url, FEED_URL);
        assert_eq!(cfg.request_timeout_secs, 15);
        assert_eq!(cfg.log_capacity, 500);
    }

    #[test]
    fn zeros_are_sanitized() {
        let cfg: TrackerConfig =
            toml::from_str("poll_interval_secs = 0\nlog_capacity = 0\nuser_agent = ' '").unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(cfg.log_capacity, DEFAULT_LOG_CAPACITY);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    }
}
