// src/feed/types.rs
use crate::error::FetchError;
use crate::feed::fetch::ValidatorState;

/// One Atom entry as parsed from the feed. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,           // may be empty when the feed omits <id>
    pub title: String,
    pub body: String,         // summary, else content; may contain markup
    pub updated: Option<i64>, // unix seconds (updated, else published)
    pub link: Option<String>,
}

impl FeedEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            updated: None,
            link: None,
        }
    }
}

/// Result of a conditional fetch that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 304: nothing changed since the validators were issued.
    Unchanged,
    Fetched {
        payload: String,
        validators: ValidatorState,
    },
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, validators: &ValidatorState) -> Result<FetchOutcome, FetchError>;
    fn url(&self) -> &str;
}
