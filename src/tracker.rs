// src/tracker.rs
//! Poll loop: fetch → parse → filter new → oldest first → classify → append.
//!
//! One cycle at a time. State (validators, seen ids) lives in the `Tracker`
//! itself; only the `EventLog` and the `TrackerStatus` are shared with readers.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::classify::{classify, Classification};
use crate::event_log::{format_utc, EventLog, IncidentRecord};
use crate::feed::atom::{parse_feed, ParseStatus};
use crate::feed::{FeedSource, FetchOutcome, SeenSet, ValidatorState};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tracker_cycles_total", "Poll cycles started.");
        describe_counter!(
            "tracker_not_modified_total",
            "Cycles ended early by a 304 response."
        );
        describe_counter!(
            "tracker_fetch_errors_total",
            "Cycles aborted by a fetch error, labelled by kind."
        );
        describe_counter!(
            "tracker_parse_anomalies_total",
            "Payloads that were only partially decodable or not at all."
        );
        describe_counter!(
            "tracker_entries_parsed_total",
            "Entries decoded from fetched payloads."
        );
        describe_counter!("tracker_entries_new_total", "Entries not seen before.");
        describe_counter!(
            "tracker_incidents_total",
            "Incident records appended to the event log."
        );
        describe_histogram!("tracker_fetch_ms", "Feed fetch time in milliseconds.");
        describe_gauge!("tracker_last_check_ts", "Unix ts of the last finished cycle.");
        describe_gauge!("tracker_event_log_len", "Records currently held in the event log.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Checking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Unchanged,
    Failed(String),
    Processed {
        parsed: usize,
        new: usize,
        recorded: usize,
    },
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Failed(_) => "failed",
            Self::Processed { .. } => "processed",
        }
    }

    pub fn recorded(&self) -> usize {
        match self {
            Self::Processed { recorded, .. } => *recorded,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
}

/// Read-only view of the poll loop for the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub cycles: u64,
    pub last_check: Option<String>,
    pub last_outcome: Option<&'static str>,
    pub last_error: Option<String>,
    pub seen_entries: usize,
}

#[derive(Debug)]
pub struct TrackerStatus {
    inner: Mutex<StatusSnapshot>,
}

impl TrackerStatus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusSnapshot {
                phase: Phase::Idle,
                cycles: 0,
                last_check: None,
                last_outcome: None,
                last_error: None,
                seen_entries: 0,
            }),
        }
    }

    fn begin_check(&self) {
        let mut s = self.inner.lock().expect("tracker status mutex poisoned");
        s.phase = Phase::Checking;
    }

    fn finish_check(&self, outcome: &CycleOutcome, seen_entries: usize, now: DateTime<Utc>) {
        let mut s = self.inner.lock().expect("tracker status mutex poisoned");
        s.phase = Phase::Idle;
        s.cycles += 1;
        s.last_check = Some(format_utc(now));
        s.last_outcome = Some(outcome.label());
        // a 304 says nothing about the last error, keep it until a real fetch
        match outcome {
            CycleOutcome::Failed(e) => s.last_error = Some(e.clone()),
            CycleOutcome::Processed { .. } => s.last_error = None,
            CycleOutcome::Unchanged => {}
        }
        s.seen_entries = seen_entries;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner
            .lock()
            .expect("tracker status mutex poisoned")
            .clone()
    }
}

impl Default for TrackerStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Tracker<S: FeedSource> {
    source: S,
    validators: ValidatorState,
    seen: SeenSet,
    log: Arc<EventLog>,
    status: Arc<TrackerStatus>,
    interval: Duration,
}

impl<S: FeedSource> Tracker<S> {
    pub fn new(source: S, log: Arc<EventLog>, interval: Duration) -> Self {
        Self {
            source,
            validators: ValidatorState::default(),
            seen: SeenSet::new(),
            log,
            status: Arc::new(TrackerStatus::new()),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Share an existing status handle (e.g. one already held by the API state).
    pub fn with_status(mut self, status: Arc<TrackerStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> Arc<TrackerStatus> {
        Arc::clone(&self.status)
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn validators(&self) -> &ValidatorState {
        &self.validators
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single Checking phase and return to Idle, whatever happened.
    pub async fn check_once(&mut self) -> CycleReport {
        ensure_metrics_described();
        counter!("tracker_cycles_total").increment(1);

        self.status.begin_check();
        let outcome = self.cycle().await;
        let now = Utc::now();
        self.status.finish_check(&outcome, self.seen.len(), now);

        gauge!("tracker_last_check_ts").set(now.timestamp() as f64);
        gauge!("tracker_event_log_len").set(self.log.len() as f64);

        CycleReport { outcome }
    }

    async fn cycle(&mut self) -> CycleOutcome {
        let (payload, validators) = match self.source.fetch(&self.validators).await {
            Ok(FetchOutcome::Unchanged) => {
                debug!(target: "tracker", url = self.source.url(), "feed not modified");
                counter!("tracker_not_modified_total").increment(1);
                return CycleOutcome::Unchanged;
            }
            Ok(FetchOutcome::Fetched {
                payload,
                validators,
            }) => (payload, validators),
            Err(e) => {
                warn!(target: "tracker", error = %e, kind = e.kind(), url = self.source.url(), "feed fetch failed");
                counter!("tracker_fetch_errors_total", "kind" => e.kind()).increment(1);
                return CycleOutcome::Failed(e.to_string());
            }
        };

        let parsed = parse_feed(&payload);
        self.validators = validators;

        match &parsed.status {
            ParseStatus::Complete => {}
            ParseStatus::Partial(reason) => {
                warn!(target: "tracker", %reason, recovered = parsed.entries.len(), "feed payload only partially decoded");
                counter!("tracker_parse_anomalies_total", "kind" => "partial").increment(1);
            }
            ParseStatus::Undecodable(reason) => {
                warn!(target: "tracker", %reason, bytes = payload.len(), "feed payload could not be decoded");
                counter!("tracker_parse_anomalies_total", "kind" => "undecodable").increment(1);
            }
        }

        let parsed_count = parsed.entries.len();
        let fresh = self.seen.filter_new(parsed.entries);
        let mut new_count = 0usize;
        let mut recorded = 0usize;

        // feeds list newest first; the log must read chronologically
        for entry in fresh.into_iter().rev() {
            if entry.id.is_empty() {
                debug!(target: "tracker", title = %entry.title, "entry has no id, cannot deduplicate");
            } else if !self.seen.mark(&entry.id) {
                // same id repeated within one payload; the older copy won
                debug!(target: "tracker", id = %entry.id, "duplicate id in payload, skipped");
                continue;
            }
            new_count += 1;

            match classify(&entry.title, &entry.body) {
                Classification::Relevant { product, status } => {
                    let ts = entry
                        .updated
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                        .unwrap_or_else(Utc::now);
                    let mut record = IncidentRecord::new(ts, product, status, entry.id);
                    record.link = entry.link;

                    info!(target: "incident", "{record}");
                    self.log.append(record);
                    recorded += 1;
                }
                Classification::Irrelevant => {
                    debug!(target: "tracker", id = %entry.id, title = %entry.title, "not an incident, skipped");
                }
            }
        }

        counter!("tracker_entries_new_total").increment(new_count as u64);
        counter!("tracker_incidents_total").increment(recorded as u64);

        info!(
            target: "tracker",
            parsed = parsed_count,
            new = new_count,
            recorded,
            "feed cycle done"
        );

        CycleOutcome::Processed {
            parsed: parsed_count,
            new: new_count,
            recorded,
        }
    }

    /// Tick forever until `shutdown` resolves. The first check runs
    /// immediately. A pending shutdown also abandons an in-flight cycle.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            target: "tracker",
            url = self.source.url(),
            interval_secs = self.interval.as_secs(),
            "status tracker started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                report = self.check_once() => {
                    debug!(target: "tracker", outcome = report.outcome.label(), "tick");
                }
            }
        }

        info!(target: "tracker", "status tracker stopped");
    }
}

impl<S: FeedSource + 'static> Tracker<S> {
    pub fn spawn<F>(self, shutdown: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::feed::fixture::ScriptedFeedSource;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
      <entry><id>e1</id><title>Elevated error rates for Embeddings</title><summary></summary></entry>
    </feed>"#;

    fn tracker(source: ScriptedFeedSource) -> Tracker<ScriptedFeedSource> {
        Tracker::new(source, Arc::new(EventLog::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn fetch_error_leaves_state_untouched() {
        let src = ScriptedFeedSource::new();
        src.push_payload(
            FEED,
            ValidatorState {
                etag: Some("\"v1\"".into()),
                last_modified: None,
            },
        );
        src.push_error(FetchError::UnexpectedStatus {
            status: 500,
            url: "fixture://feed.atom".into(),
        });
        let mut t = tracker(src);

        t.check_once().await;
        let before = t.validators().clone();
        let report = t.check_once().await;

        assert!(matches!(report.outcome, CycleOutcome::Failed(_)));
        assert_eq!(t.validators(), &before);
        assert_eq!(t.seen().len(), 1);

        let st = t.status().snapshot();
        assert_eq!(st.phase, Phase::Idle);
        assert_eq!(st.cycles, 2);
        assert_eq!(st.last_outcome, Some("failed"));
        assert!(st.last_error.as_deref().unwrap_or_default().contains("500"));
    }

    #[tokio::test]
    async fn empty_body_uses_title_and_entry_timestamp_falls_back_to_now() {
        let src = ScriptedFeedSource::new();
        src.push_payload(FEED, ValidatorState::default());
        let log = Arc::new(EventLog::new());
        let mut t = Tracker::new(src, Arc::clone(&log), Duration::from_secs(60));

        t.check_once().await;
        let rec = log.latest().expect("one record");
        assert_eq!(rec.status, "Elevated error rates for Embeddings");
        assert_eq!(rec.timestamp.len(), "2026-01-01 00:00:00".len());
    }
}
