// src/error.rs
//! Fetch error taxonomy. Every variant is recoverable: the poll loop logs it
//! and waits for the next tick.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Unreachable host, connection reset, TLS failure...
    #[error("could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Anything other than 200 or 304.
    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Classify a transport error, separating timeouts from other failures.
    pub fn from_transport(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }

    /// Short label used for metrics and the health view.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::UnexpectedStatus { .. } => "status",
            Self::Body { .. } => "body",
        }
    }
}
