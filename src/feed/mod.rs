// src/feed/mod.rs
pub mod atom;
pub mod fetch;
pub mod fixture;
pub mod seen;
pub mod types;

pub use atom::{parse, parse_feed, ParseStatus, ParsedFeed};
pub use fetch::{HttpFeedSource, ValidatorState};
pub use seen::SeenSet;
pub use types::{FeedEntry, FeedSource, FetchOutcome};

/// Default tracked resource.
pub const FEED_URL: &str = "https://status.openai.com/history.atom";
