//! Bounded prompt block built from normalized records.
use crate::ingest::{truncate_chars, NormalizedRecord};

/// Separator between record blocks. Never appears inside a block.
pub const RECORD_DELIMITER: &str = "\n\n---\n[RECORD END]\n---\n\n";
const RECORD_MARKER: &str = "[RECORD END]";

/// Join the `llm_text` of the first `max_records` records, each cut to
/// `max_chars_per_record` characters. Empty input gives `""`.
pub fn format_records(
    records: &[NormalizedRecord],
    max_records: usize,
    max_chars_per_record: usize,
) -> String {
    records
        .iter()
        .take(max_records)
        .map(|r| truncate_chars(&scrub_marker(&r.llm_text), max_chars_per_record))
        .collect::<Vec<_>>()
        .join(RECORD_DELIMITER)
}

/// Remove the marker until none is left; one pass can splice a new one together.
fn scrub_marker(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains(RECORD_MARKER) {
        out = out.replace(RECORD_MARKER, "");
    }
    out
}
