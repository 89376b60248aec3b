use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::event_log::{EventLog, IncidentRecord};
use crate::tracker::{StatusSnapshot, TrackerStatus};

#[derive(Clone)]
pub struct AppState {
    pub log: Arc<EventLog>,
    pub status: Arc<TrackerStatus>,
    pub feed_url: String,
}

impl AppState {
    pub fn new(log: Arc<EventLog>, status: Arc<TrackerStatus>, feed_url: impl Into<String>) -> Self {
        Self {
            log,
            status,
            feed_url: feed_url.into(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/incidents", get(get_incidents))
        .route("/incidents/latest", get(get_latest))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Health {
    pub status: &'static str,
    pub feed_url: String,
    pub records: usize,
    pub tracker: StatusSnapshot,
}

/// Liveness plus a peek at the poll loop. Fetch errors never make this fail;
/// they show up as `tracker.last_error`.
pub fn health(state: &AppState) -> Health {
    Health {
        status: "ok",
        feed_url: state.feed_url.clone(),
        records: state.log.len(),
        tracker: state.status.snapshot(),
    }
}

async fn get_health(State(state): State<AppState>) -> Json<Health> {
    Json(health(&state))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Default, serde::Deserialize)]
struct IncidentsQuery {
    #[serde(default)]
    order: Order,
    #[serde(default)]
    limit: Option<usize>,
}

async fn get_incidents(
    State(state): State<AppState>,
    Query(q): Query<IncidentsQuery>,
) -> Json<Vec<IncidentRecord>> {
    let mut rows = match q.order {
        Order::Newest => state.log.snapshot_newest_first(),
        Order::Oldest => state.log.snapshot(),
    };
    if let Some(n) = q.limit {
        rows.truncate(n);
    }
    Json(rows)
}

async fn get_latest(State(state): State<AppState>) -> Json<Option<IncidentRecord>> {
    Json(state.log.latest())
}
