// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod event_log;
pub mod feed;
pub mod metrics;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::classify::{classify, Classification};
pub use crate::config::TrackerConfig;
pub use crate::event_log::{EventLog, IncidentRecord};
pub use crate::feed::FEED_URL;
pub use crate::tracker::{CycleOutcome, CycleReport, Tracker, TrackerStatus};

use std::sync::Arc;
use std::time::Duration;

use crate::feed::HttpFeedSource;

/// Everything a host needs: the HTTP read view and a poll loop sharing the
/// same event log and status handle. The caller decides when to spawn.
pub struct App {
    pub router: axum::Router,
    pub tracker: Tracker<HttpFeedSource>,
}

/// Wire log, status, HTTP source and router from a config.
pub fn build_app(cfg: &TrackerConfig) -> anyhow::Result<App> {
    let log = Arc::new(EventLog::with_capacity(cfg.log_capacity));
    let source =
        HttpFeedSource::with_options(&cfg.feed_url, cfg.request_timeout_secs, &cfg.user_agent)?;
    let tracker = Tracker::new(
        source,
        Arc::clone(&log),
        Duration::from_secs(cfg.poll_interval_secs),
    );
    let state = AppState::new(log, tracker.status(), cfg.feed_url.clone());
    Ok(App {
        router: create_router(state),
        tracker,
    })
}
