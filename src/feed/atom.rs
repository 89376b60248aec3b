// src/feed/atom.rs
//! Tolerant Atom parser.
//!
//! Streams the document with `quick_xml::Reader` instead of deserializing it
//! in one go, so a truncated or broken payload still yields every entry that
//! was complete before the error. The parser never fails: problems are
//! reported through [`ParseStatus`] and the caller decides what to do.

use metrics::counter;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::feed::types::FeedEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// Well-formed Atom document. Zero entries means the feed is empty.
    Complete,
    /// Decoding stopped early; the entries before the problem were kept.
    Partial(String),
    /// Nothing could be recovered.
    Undecodable(String),
}

impl ParseStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub entries: Vec<FeedEntry>,
    pub status: ParseStatus,
}

/// Entries only, in feed order. Malformed input yields as many entries as
/// could be recovered, possibly none.
pub fn parse(payload: &str) -> Vec<FeedEntry> {
    parse_feed(payload).entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Content,
    Updated,
    Published,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Self::Id),
            b"title" => Some(Self::Title),
            b"summary" => Some(Self::Summary),
            b"content" => Some(Self::Content),
            b"updated" => Some(Self::Updated),
            b"published" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    content: Option<String>,
    updated: Option<String>,
    published: Option<String>,
    link: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Id => self.id = text.trim().to_string(),
            Field::Title => self.title = text,
            Field::Summary => self.summary = text,
            // first <content> wins
            Field::Content => {
                if self.content.is_none() {
                    self.content = Some(text)
                }
            }
            Field::Updated => self.updated = Some(text),
            Field::Published => self.published = Some(text),
        }
    }

    fn take_link(&mut self, e: &BytesStart<'_>) {
        if self.link.is_some() {
            return;
        }
        let rel = attr(e, "rel");
        if matches!(rel.as_deref(), None | Some("alternate")) {
            self.link = attr(e, "href");
        }
    }

    fn build(self) -> FeedEntry {
        let body = if self.summary.trim().is_empty() {
            self.content.unwrap_or_default()
        } else {
            self.summary
        };
        let updated = self
            .updated
            .as_deref()
            .and_then(parse_rfc3339_to_unix)
            .or_else(|| self.published.as_deref().and_then(parse_rfc3339_to_unix));
        FeedEntry {
            id: self.id,
            title: self.title.trim().to_string(),
            body,
            updated,
            link: self.link,
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

fn push_text(buf: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() && !buf.ends_with(char::is_whitespace) {
        buf.push(' ');
    }
    buf.push_str(text);
}

/// Parse an Atom payload into entries (feed order) plus a status describing
/// how much of the document could be decoded.
pub fn parse_feed(payload: &str) -> ParsedFeed {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut saw_feed_root = false;
    let mut depth = 0usize;

    let mut entry: Option<(EntryBuilder, usize)> = None;
    let mut field: Option<(Field, usize)> = None;
    let mut buf = String::new();

    let mut failure: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                let name = local.as_ref();

                if depth == 1 && name == b"feed" {
                    saw_feed_root = true;
                } else if field.is_some() {
                    // nested markup inside a text construct (type="xhtml"),
                    // its text is picked up below
                } else if let Some((builder, entry_depth)) = entry.as_mut() {
                    if depth == *entry_depth + 1 {
                        if name == b"link" {
                            builder.take_link(&e);
                        } else if let Some(f) = Field::from_local_name(name) {
                            field = Some((f, depth));
                            buf.clear();
                        }
                    }
                } else if name == b"entry" {
                    entry = Some((EntryBuilder::default(), depth));
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some((builder, entry_depth)) = entry.as_mut() {
                    if field.is_none() && depth == *entry_depth && e.local_name().as_ref() == b"link"
                    {
                        builder.take_link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    match t.unescape() {
                        Ok(s) => push_text(&mut buf, &s),
                        // HTML entities XML does not know (&nbsp; in xhtml content)
                        Err(_) => push_text(&mut buf, &String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    push_text(&mut buf, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                if let Some((f, d)) = field {
                    if d == depth {
                        if let Some((builder, _)) = entry.as_mut() {
                            builder.set(f, std::mem::take(&mut buf));
                        }
                        field = None;
                    }
                } else if matches!(&entry, Some((_, d)) if *d == depth)
                    && e.local_name().as_ref() == b"entry"
                {
                    if let Some((builder, _)) = entry.take() {
                        entries.push(builder.build());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                failure = Some(format!(
                    "xml error at byte {}: {e}",
                    reader.error_position()
                ));
                break;
            }
        }
    }

    if failure.is_none() && (entry.is_some() || depth > 0) {
        failure = Some("document ended before all elements were closed".to_string());
    }
    if failure.is_none() && !saw_feed_root {
        failure = Some("no Atom <feed> root element".to_string());
    }

    let status = match failure {
        None => ParseStatus::Complete,
        Some(reason) if entries.is_empty() => ParseStatus::Undecodable(reason),
        Some(reason) => ParseStatus::Partial(reason),
    };

    counter!("tracker_entries_parsed_total").increment(entries.len() as u64);
    ParsedFeed { entries, status }
}
