// src/feed/fetch.rs
//! Conditional GET of the tracked feed resource.

use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::{
    HeaderMap, HeaderName, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, StatusCode};

use crate::error::FetchError;
use crate::feed::types::{FeedSource, FetchOutcome};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str = concat!("StatusIncidentTracker/", env!("CARGO_PKG_VERSION"));

/// Cache validators of the last full (200) response. Opaque tokens, echoed
/// back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorState {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl ValidatorState {
    /// Read validators from a 200 response. A missing header yields `None`;
    /// the previous value is intentionally not carried over.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            etag: read(ETAG),
            last_modified: read(LAST_MODIFIED),
        }
    }

    /// Conditional request headers for the validators that are present.
    pub fn conditional_headers(&self) -> Vec<(HeaderName, String)> {
        let mut out = Vec::with_capacity(2);
        if let Some(etag) = &self.etag {
            out.push((IF_NONE_MATCH, etag.clone()));
        }
        if let Some(lm) = &self.last_modified {
            out.push((IF_MODIFIED_SINCE, lm.clone()));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// reqwest-backed source for a single feed URL.
#[derive(Clone)]
pub struct HttpFeedSource {
    url: String,
    client: Client,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_options(url, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT)
    }

    pub fn with_options(
        url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, validators: &ValidatorState) -> Result<FetchOutcome, FetchError> {
        let t0 = std::time::Instant::now();

        let mut req = self.client.get(&self.url);
        for (name, value) in validators.conditional_headers() {
            req = req.header(name, value);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::from_transport(&self.url, e))?;

        let outcome = match resp.status() {
            StatusCode::NOT_MODIFIED => FetchOutcome::Unchanged,
            StatusCode::OK => {
                let validators = ValidatorState::from_headers(resp.headers());
                let payload = resp.text().await.map_err(|e| {
                    if e.is_timeout() {
                        FetchError::Timeout {
                            url: self.url.clone(),
                        }
                    } else {
                        FetchError::Body {
                            url: self.url.clone(),
                            source: e,
                        }
                    }
                })?;
                FetchOutcome::Fetched {
                    payload,
                    validators,
                }
            }
            other => {
                return Err(FetchError::UnexpectedStatus {
                    status: other.as_u16(),
                    url: self.url.clone(),
                })
            }
        };

        histogram!("tracker_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(outcome)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
