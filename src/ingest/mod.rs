// src/ingest/mod.rs
pub mod config;
pub mod discussion;
pub mod news;
pub mod providers;
pub mod types;

use metrics::describe_counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

pub use types::{FetchError, NormalizedRecord};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "fetch_attempts_total",
            "Raw items inspected across all search calls."
        );
        describe_counter!(
            "fetch_records_total",
            "Records kept after filtering and normalization."
        );
        describe_counter!(
            "fetch_source_errors_total",
            "Search calls that failed (transport or payload)."
        );
    });
}

/// Decode entities, strip tags, fold curly quotes and collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// First `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Preview with a trailing ellipsis when the text was cut.
pub fn preview(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub level: JournalLevel,
    pub message: String,
}

/// Progress messages of one fetch, returned to the caller so any surface
/// (terminal, HTTP) can render them. Every entry is also emitted to tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        self.entries.push(JournalEntry {
            level: JournalLevel::Info,
            message,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.entries.push(JournalEntry {
            level: JournalLevel::Warn,
            message,
        });
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn warnings(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == JournalLevel::Warn)
            .count()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| match e.level {
                JournalLevel::Info => e.message.clone(),
                JournalLevel::Warn => format!("warning: {}", e.message),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "<p>Stocks&nbsp;<b>rally</b> &ldquo;hard&rdquo;</p>\n\n ";
        assert_eq!(normalize_text(s), r#"Stocks rally "hard""#);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn journal_counts_warnings() {
        let mut j = Journal::new();
        j.info("searching stocks");
        j.warn("search failed in news");
        assert_eq!(j.entries().len(), 2);
        assert_eq!(j.warnings(), 1);
        assert!(j.render().contains("warning: search failed in news"));
    }
}
