//! Lexical polarity scoring with a finance-specific adjustment table.
//!
//! The base polarity is the mean of the lexicon values of every polar word in the
//! text (a negator within the previous three tokens flips and halves the word).
//! The finance table is then matched by substring against the lowercase text and
//! every hit is added on top. The result is clamped to `[-1, 1]`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../config/sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

/// Signed adjustments for finance vocabulary. Matched as substrings, so one
/// text can collect several hits at once.
pub const FINANCE_ADJUSTMENTS: &[(&str, f64)] = &[
    ("crash", -0.3),
    ("collapse", -0.3),
    ("plummet", -0.3),
    ("tank", -0.25),
    ("bearish", -0.2),
    ("sell-off", -0.2),
    ("downturn", -0.15),
    ("recession", -0.25),
    ("bankruptcy", -0.35),
    ("default", -0.25),
    ("debt", -0.1),
    ("inflation", -0.1),
    ("bullish", 0.2),
    ("rally", 0.2),
    ("surge", 0.25),
    ("soar", 0.25),
    ("outperform", 0.2),
    ("beat", 0.15),
    ("growth", 0.15),
    ("profit", 0.2),
    ("buy", 0.1),
    ("upgrade", 0.15),
    ("dividend", 0.15),
    ("recovery", 0.15),
];

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_polarity(&self, w: &str) -> f64 {
        LEXICON.get(w).copied().unwrap_or(0.0)
    }

    /// Mean polarity of lexicon words, in `[-1, 1]`. Zero when nothing matches.
    pub fn base_polarity(&self, text: &str) -> f64 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let base = self.word_polarity(tokens[i].as_str());
            if base == 0.0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            sum += if negated { -0.5 * base } else { base };
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            (sum / hits as f64).clamp(-1.0, 1.0)
        }
    }

    /// Sum of every finance adjustment whose term occurs in the text.
    pub fn finance_adjustment(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        FINANCE_ADJUSTMENTS
            .iter()
            .filter(|(term, _)| lower.contains(term))
            .map(|(_, v)| v)
            .sum()
    }

    /// Final score in `[-1, 1]`. Empty text scores `0.0`.
    pub fn score_text(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        (self.base_polarity(text) + self.finance_adjustment(text)).clamp(-1.0, 1.0)
    }
}

/// Convenience entry accepting either `&str` or `Option<&str>`; absent input scores `0.0`.
pub fn score<'a>(text: impl Into<Option<&'a str>>) -> f64 {
    match text.into() {
        Some(t) => SentimentAnalyzer::new().score_text(t),
        None => 0.0,
    }
}

/// Arithmetic mean over finite scores; `0.0` for an empty set.
pub fn mean_sentiment<I: IntoIterator<Item = f64>>(scores: I) -> f64 {
    let (sum, n) = scores
        .into_iter()
        .filter(|s| s.is_finite())
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Alphanumeric tokens (apostrophes kept for negators like "isn't"), lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "without"
    )
}
