//! Date helpers: lenient parsing of user-entered dates, recency buckets for
//! server-side search scoping, and the application-side date window.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Tried in order; the first successful parse wins. `01/02/2024` therefore
/// resolves day-first.
pub const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%m-%d-%Y", "%d %b %Y", "%b %d %Y",
];

/// Parse a date in one of [`DATE_FORMATS`]. Empty, absent or unrecognised input gives `None`.
pub fn parse_date<'a>(input: impl Into<Option<&'a str>>) -> Option<NaiveDate> {
    let s = input.into()?.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok());
    if parsed.is_none() {
        tracing::debug!(input = s, "could not parse date");
    }
    parsed
}

/// Coarse time window understood by the search collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyBucket {
    Day,
    Week,
    Month,
    Year,
    All,
}

impl RecencyBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecencyBucket::Day => "day",
            RecencyBucket::Week => "week",
            RecencyBucket::Month => "month",
            RecencyBucket::Year => "year",
            RecencyBucket::All => "all",
        }
    }

    /// Google-style `tbs` value; `None` means unrestricted.
    pub fn as_serp_tbs(&self) -> Option<&'static str> {
        match self {
            RecencyBucket::Day => Some("qdr:d"),
            RecencyBucket::Week => Some("qdr:w"),
            RecencyBucket::Month => Some("qdr:m"),
            RecencyBucket::Year => Some("qdr:y"),
            RecencyBucket::All => None,
        }
    }

    /// Bucket for a whole number of elapsed days.
    pub fn from_elapsed_days(days: i64) -> Self {
        match days {
            d if d <= 1 => RecencyBucket::Day,
            d if d <= 7 => RecencyBucket::Week,
            d if d <= 31 => RecencyBucket::Month,
            d if d <= 365 => RecencyBucket::Year,
            _ => RecencyBucket::All,
        }
    }
}

impl std::fmt::Display for RecencyBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smallest bucket that still covers `start` when searching at `now`.
/// The bucket is advisory; [`DateBounds`] enforces the exact window.
pub fn bucket_for_range(start: NaiveDateTime, now: NaiveDateTime) -> RecencyBucket {
    RecencyBucket::from_elapsed_days((now - start).num_days())
}

/// Inclusive start, end padded by one day for timezone slop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateBounds {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start: start.map(start_of_day),
            end: end.map(start_of_day),
        }
    }

    /// Build bounds from raw user strings. A start without an end runs up to `now`.
    pub fn from_inputs(start: Option<&str>, end: Option<&str>, now: NaiveDateTime) -> Self {
        let start = parse_date(start).map(start_of_day);
        let end = match (start, parse_date(end)) {
            (_, Some(e)) => Some(start_of_day(e)),
            (Some(_), None) => Some(now),
            (None, None) => None,
        };
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        if let Some(start) = self.start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if ts > end + Duration::days(1) {
                return false;
            }
        }
        true
    }

    /// Recency hint for the search call. Month when no start is known.
    pub fn recency(&self, now: NaiveDateTime) -> RecencyBucket {
        self.start
            .map(|s| bucket_for_range(s, now))
            .unwrap_or(RecencyBucket::Month)
    }

    /// Phrase used inside prompts to describe the window.
    pub fn describe(&self) -> String {
        let fmt = |d: NaiveDateTime| d.format("%Y-%m-%d").to_string();
        match (self.start, self.end) {
            (Some(s), Some(e)) => format!("between {} and {}", fmt(s), fmt(e)),
            (Some(s), None) => format!("since {}", fmt(s)),
            (None, Some(e)) => format!("up to {}", fmt(e)),
            (None, None) => "over the default period (likely past month)".to_string(),
        }
    }
}

pub fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}
