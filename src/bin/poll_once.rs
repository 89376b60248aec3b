//! Runs a single poll cycle against the configured feed and prints every
//! incident found. Handy for checking connectivity and classification.

use status_incident_tracker::{build_app, CycleOutcome, TrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = TrackerConfig::load_default()?;
    let mut app = build_app(&cfg)?;

    println!("Feed: {}", cfg.feed_url);
    let report = app.tracker.check_once().await;

    match &report.outcome {
        CycleOutcome::Unchanged => println!("feed not modified"),
        CycleOutcome::Failed(e) => anyhow::bail!("poll failed: {e}"),
        CycleOutcome::Processed {
            parsed,
            new,
            recorded,
        } => {
            println!("parsed={parsed} new={new} incidents={recorded}");
        }
    }

    for record in app.tracker.log().snapshot() {
        println!("{record}");
    }

    Ok(())
}
