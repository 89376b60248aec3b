// src/feed/fixture.rs
//! In-memory feed source for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::feed::fetch::ValidatorState;
use crate::feed::types::{FeedSource, FetchOutcome};

/// Replays a queue of scripted responses, one per fetch. Once the queue is
/// drained every further fetch is `Unchanged`. The validators sent with each
/// fetch are recorded.
pub struct ScriptedFeedSource {
    url: String,
    script: Mutex<VecDeque<Result<FetchOutcome, FetchError>>>,
    pub calls: Mutex<Vec<ValidatorState>>,
}

impl ScriptedFeedSource {
    pub fn new() -> Self {
        Self {
            url: "fixture://feed.atom".to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(vec![]),
        }
    }

    /// Queue a 200 response with the given body and validators.
    pub fn push_payload(&self, payload: &str, validators: ValidatorState) -> &Self {
        self.push(Ok(FetchOutcome::Fetched {
            payload: payload.to_string(),
            validators,
        }))
    }

    pub fn push_unchanged(&self) -> &Self {
        self.push(Ok(FetchOutcome::Unchanged))
    }

    pub fn push_error(&self, err: FetchError) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, item: Result<FetchOutcome, FetchError>) -> &Self {
        self.script
            .lock()
            .expect("fixture script mutex poisoned")
            .push_back(item);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("fixture calls mutex poisoned").len()
    }
}

impl Default for ScriptedFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for ScriptedFeedSource {
    async fn fetch(&self, validators: &ValidatorState) -> Result<FetchOutcome, FetchError> {
        self.calls
            .lock()
            .expect("fixture calls mutex poisoned")
            .push(validators.clone());
        self.script
            .lock()
            .expect("fixture script mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(FetchOutcome::Unchanged))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
