// src/classify.rs
//! Incident classification: keyword relevance gate, product extraction and
//! status-message cleanup.
//!
//! Both taxonomies are small fixed lists scanned linearly. Product matching
//! is first-match-wins in *list* order, never text order.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Known products, most specific first. Extend as new products ship.
pub const KNOWN_PRODUCTS: &[&str] = &[
    "Chat Completions",
    "Responses API",
    "Completions",
    "Embeddings",
    "Fine-tuning",
    "Images",
    "Audio",
    "Assistants",
    "Batch API",
    "Files API",
    "Moderation",
    "Realtime API",
    "Vector Stores",
    "Code Interpreter",
    "Function Calling",
    "Structured Outputs",
    "OpenAI API",
];

/// Entries without any of these (case-insensitive substring) are skipped,
/// e.g. maintenance notices.
pub const INCIDENT_KEYWORDS: &[&str] = &[
    "incident",
    "outage",
    "degraded",
    "degradation",
    "disruption",
    "partial",
    "investigating",
    "identified",
    "monitoring",
    "resolved",
    "update",
    "elevated",
    "error",
    "latency",
    "unavailable",
    "down",
    "failure",
];

pub const PRODUCT_NAMESPACE: &str = "OpenAI API";
pub const MAX_STATUS_CHARS: usize = 300;
pub const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Relevant { product: String, status: String },
    Irrelevant,
}

fn combined_lower(title: &str, body: &str) -> String {
    format!("{title} {body}").to_lowercase()
}

pub fn is_incident(title: &str, body: &str) -> bool {
    let text = combined_lower(title, body);
    INCIDENT_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// `"OpenAI API - <product>"` for the first listed product mentioned
/// anywhere in title or body, else the bare namespace.
pub fn extract_product(title: &str, body: &str) -> String {
    let text = combined_lower(title, body);
    KNOWN_PRODUCTS
        .iter()
        .find(|p| text.contains(&p.to_lowercase()))
        .map(|p| format!("{PRODUCT_NAMESPACE} - {p}"))
        .unwrap_or_else(|| PRODUCT_NAMESPACE.to_string())
}

/// Strip markup, collapse whitespace and cap the length at
/// [`MAX_STATUS_CHARS`] characters (plus an ellipsis when cut).
pub fn clean_status(raw: &str) -> String {
    // 1) HTML entity decode (&amp; &nbsp; &lt;p&gt; ...), before tag
    //    stripping so escaped markup is removed too
    let out = html_escape::decode_html_entities(raw);

    // 2) Every tag becomes one space
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"));
    let out = re_tags.replace_all(&out, " ");

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    let out = re_ws.replace_all(&out, " ");
    let out = out.trim();

    // 4) Length cap
    if out.chars().count() > MAX_STATUS_CHARS {
        let mut cut: String = out.chars().take(MAX_STATUS_CHARS).collect();
        cut.push(ELLIPSIS);
        cut
    } else {
        out.to_string()
    }
}

pub fn classify(title: &str, body: &str) -> Classification {
    if !is_incident(title, body) {
        return Classification::Irrelevant;
    }
    let cleaned = clean_status(body);
    let status = if cleaned.is_empty() {
        title.to_string()
    } else {
        cleaned
    };
    Classification::Relevant {
        product: extract_product(title, body),
        status,
    }
}
