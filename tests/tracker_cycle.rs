// tests/tracker_cycle.rs
//
// Poll-cycle behaviour against a scripted feed source (no network).

use std::sync::Arc;
use std::time::Duration;

use status_incident_tracker::feed::fixture::ScriptedFeedSource;
use status_incident_tracker::feed::ValidatorState;
use status_incident_tracker::tracker::Phase;
use status_incident_tracker::{CycleOutcome, EventLog, Tracker};

const HISTORY: &str = include_str!("fixtures/history.atom");

fn atom(entries: &[(&str, &str, &str)]) -> String {
    let mut s = String::from(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>t</title>"#);
    for (id, title, body) in entries {
        s.push_str(&format!(
            "<entry><id>{id}</id><title>{title}</title><summary>{body}</summary></entry>"
        ));
    }
    s.push_str("</feed>");
    s
}

fn etag(v: &str) -> ValidatorState {
    ValidatorState {
        etag: Some(v.to_string()),
        last_modified: None,
    }
}

fn new_tracker(src: ScriptedFeedSource) -> (Tracker<ScriptedFeedSource>, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let t = Tracker::new(src, Arc::clone(&log), Duration::from_secs(60));
    (t, log)
}

#[tokio::test]
async fn two_entry_payload_yields_only_the_incident() {
    let src = ScriptedFeedSource::new();
    src.push_payload(
        &atom(&[
            ("e1", "Elevated error rates for Embeddings", ""),
            ("e2", "Scheduled maintenance window", ""),
        ]),
        ValidatorState::default(),
    );
    let (mut t, log) = new_tracker(src);

    let report = t.check_once().await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Processed {
            parsed: 2,
            new: 2,
            recorded: 1
        }
    );

    let rows = log.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].product, "OpenAI API - Embeddings");
    assert_eq!(rows[0].entry_id, "e1");
    // both were committed as seen, relevant or not
    assert!(t.seen().contains("e1"));
    assert!(t.seen().contains("e2"));
}

#[tokio::test]
async fn not_modified_second_cycle_adds_nothing() {
    let src = ScriptedFeedSource::new();
    src.push_payload(&atom(&[("a", "Partial outage", "")]), etag("\"v1\""))
        .push_unchanged();
    let (mut t, log) = new_tracker(src);

    t.check_once().await;
    let second = t.check_once().await;

    assert_eq!(second.outcome, CycleOutcome::Unchanged);
    assert_eq!(log.len(), 1);
    assert_eq!(t.validators(), &etag("\"v1\""));
}

#[tokio::test]
async fn seen_entries_are_never_recorded_twice() {
    let feed_v1 = atom(&[("a", "Outage A", "")]);
    let feed_v2 = atom(&[("b", "Outage B", ""), ("a", "Outage A (update)", "")]);

    let src = ScriptedFeedSource::new();
    src.push_payload(&feed_v1, etag("\"1\""))
        .push_payload(&feed_v2, etag("\"2\""))
        .push_payload(&feed_v2, etag("\"3\""));
    let (mut t, log) = new_tracker(src);

    for _ in 0..3 {
        t.check_once().await;
    }

    let ids: Vec<_> = log.snapshot().into_iter().map(|r| r.entry_id).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn repeated_id_within_one_payload_is_recorded_once() {
    let src = ScriptedFeedSource::new();
    src.push_payload(
        &atom(&[("x", "Outage (update)", ""), ("x", "Outage", "")]),
        ValidatorState::default(),
    );
    let (mut t, log) = new_tracker(src);

    let report = t.check_once().await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Processed {
            parsed: 2,
            new: 1,
            recorded: 1
        }
    );

    let rows = log.snapshot();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entry_id, "x");
    // oldest copy (last in feed order) is the one committed
    assert_eq!(rows[0].status, "Outage");
}

#[tokio::test]
async fn new_entries_are_appended_oldest_first() {
    let src = ScriptedFeedSource::new();
    src.push_payload(
        &atom(&[
            ("C", "Incident C", ""),
            ("B", "Incident B", ""),
            ("A", "Incident A", ""),
        ]),
        ValidatorState::default(),
    );
    let (mut t, log) = new_tracker(src);

    t.check_once().await;

    let ids: Vec<_> = log.snapshot().into_iter().map(|r| r.entry_id).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn entries_without_keywords_produce_no_record() {
    let src = ScriptedFeedSource::new();
    src.push_payload(
        &atom(&[("n1", "New model available", "Try it in the playground")]),
        ValidatorState::default(),
    );
    let (mut t, log) = new_tracker(src);

    let report = t.check_once().await;
    assert_eq!(report.outcome.recorded(), 0);
    assert!(log.is_empty());
    assert!(t.seen().contains("n1"));
}

#[tokio::test]
async fn validators_are_sent_and_replaced_wholesale() {
    let src = ScriptedFeedSource::new();
    src.push_payload(
        &atom(&[]),
        ValidatorState {
            etag: Some("\"v1\"".into()),
            last_modified: Some("Wed, 14 Oct 2026 10:00:00 GMT".into()),
        },
    )
    // second 200 carries only an ETag: Last-Modified must be dropped
    .push_payload(&atom(&[]), etag("\"v2\""))
    .push_unchanged();
    let (mut t, _log) = new_tracker(src);

    t.check_once().await;
    t.check_once().await;
    t.check_once().await;

    let calls = t.source().calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], ValidatorState::default());
    assert_eq!(calls[1].etag.as_deref(), Some("\"v1\""));
    assert!(calls[1].last_modified.is_some());
    assert_eq!(calls[2], etag("\"v2\""));
}

#[tokio::test]
async fn entries_without_id_are_always_new() {
    let feed = atom(&[("", "Degraded performance", "")]);
    let src = ScriptedFeedSource::new();
    src.push_payload(&feed, ValidatorState::default())
        .push_payload(&feed, ValidatorState::default());
    let (mut t, log) = new_tracker(src);

    t.check_once().await;
    t.check_once().await;

    assert_eq!(log.len(), 2);
    assert!(t.seen().is_empty());
}

#[tokio::test]
async fn undecodable_payload_still_updates_validators() {
    let src = ScriptedFeedSource::new();
    src.push_payload("<html>maintenance page</html>", etag("\"broken\""));
    let (mut t, log) = new_tracker(src);

    let report = t.check_once().await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Processed {
            parsed: 0,
            new: 0,
            recorded: 0
        }
    );
    assert!(log.is_empty());
    assert_eq!(t.validators(), &etag("\"broken\""));
}

#[tokio::test]
async fn partial_payload_records_recovered_entries() {
    let broken = r#"<feed><entry><id>ok</id><title>Outage</title></entry><entry><id>bad</id><title>Outage 2</titel></entry></feed>"#;
    let src = ScriptedFeedSource::new();
    src.push_payload(broken, ValidatorState::default());
    let (mut t, log) = new_tracker(src);

    t.check_once().await;
    let ids: Vec<_> = log.snapshot().into_iter().map(|r| r.entry_id).collect();
    assert_eq!(ids, vec!["ok"]);
}

#[tokio::test]
async fn fixture_feed_end_to_end() {
    let src = ScriptedFeedSource::new();
    src.push_payload(HISTORY, etag("W/\"abc\""));
    let (mut t, log) = new_tracker(src);

    let report = t.check_once().await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Processed {
            parsed: 3,
            new: 3,
            recorded: 2
        }
    );

    let rows = log.snapshot();
    assert_eq!(rows[0].product, "OpenAI API - Chat Completions");
    assert_eq!(rows[0].timestamp, "2026-10-14 10:01:00");
    assert_eq!(rows[0].status, "Resolved - This incident has been resolved.");

    // Embeddings precedes Images in the product list
    assert_eq!(rows[1].product, "OpenAI API - Embeddings");
    assert_eq!(rows[1].timestamp, "2026-10-15 14:05:11");
    assert!(
        rows[1].status.starts_with("Oct 15 , 14:05 UTC Monitoring - A fix"),
        "status: {}",
        rows[1].status
    );
    assert_eq!(
        rows[1].link.as_deref(),
        Some("https://status.openai.com/incidents/01JINC24003")
    );
}

#[tokio::test(start_paused = true)]
async fn run_checks_immediately_then_every_interval_until_shutdown() {
    let src = ScriptedFeedSource::new();
    src.push_payload(&atom(&[("a", "Outage", "")]), ValidatorState::default());
    let log = Arc::new(EventLog::new());
    let tracker = Tracker::new(src, Arc::clone(&log), Duration::from_secs(60));
    let status = tracker.status();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tracker.spawn(async {
        let _ = rx.await;
    });

    // first check runs without waiting a full interval
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(status.snapshot().cycles, 1);
    assert_eq!(log.len(), 1);

    // five more intervals, all answered with 304 by the drained script
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    let snap = status.snapshot();
    assert_eq!(snap.cycles, 6);
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.last_outcome, Some("unchanged"));
    assert_eq!(log.len(), 1);

    tx.send(()).unwrap();
    handle.await.unwrap();
}
