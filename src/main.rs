//! Status Incident Tracker binary entrypoint.
//! Boots the poll loop in the background and serves the read API via Axum.

use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use status_incident_tracker::metrics::Metrics;
use status_incident_tracker::{build_app, TrackerConfig};

/// Compact console logs, or JSON lines with LOG_FORMAT=json. `try_init`
/// keeps a subscriber the host may already have installed.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("status_incident_tracker=info,tracker=info,incident=info,warn")
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = TrackerConfig::load_default()?;
    info!(
        feed = %cfg.feed_url,
        interval_secs = cfg.poll_interval_secs,
        "loaded tracker config"
    );

    let app = build_app(&cfg)?;
    let mut router = app.router;

    match Metrics::init(cfg.poll_interval_secs) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "metrics endpoint disabled"),
    }

    // Poll loop lives for the whole process; ctrl-c stops it.
    app.tracker.spawn(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    Ok(router.into())
}
