use axum::{http::header, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Publishes the configured poll
    /// interval as a static gauge.
    pub fn init(poll_interval_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        gauge!("tracker_poll_interval_secs").set(poll_interval_secs as f64);

        Ok(Self { handle })
    }

    /// `/metrics` scrape endpoint for the tracker's counters and gauges.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let scrape = handle.clone();
                async move {
                    (
                        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
                        scrape.render(),
                    )
                }
            }),
        )
    }
}
