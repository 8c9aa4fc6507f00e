//! Relative temporal phrase extraction.
//!
//! A fixed table of relative phrases ("yesterday", "last week", "N days
//! ago", ...) maps to absolute `[start, end)` ranges anchored on the
//! evaluation instant supplied by the caller. Only the first matching
//! phrase in a query is applied; the matched phrase is stripped from the
//! residual text. Anything that fails to parse is left as plain text,
//! never an error.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A half-open absolute time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `instant` falls within `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// A temporal phrase extracted from query text.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalMatch {
    pub range: DateRange,
    /// The phrase as it appeared in the query, for stripping.
    pub phrase: String,
}

/// Fixed phrase table, checked in order. "N days ago" is handled
/// separately since it carries a capture.
static PHRASE_PATTERNS: Lazy<Vec<(Regex, RelativePhrase)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\byesterday\b").unwrap(),
            RelativePhrase::Yesterday,
        ),
        (
            Regex::new(r"(?i)\blast\s+week\b").unwrap(),
            RelativePhrase::LastWeek,
        ),
        (
            Regex::new(r"(?i)\bthis\s+month\b").unwrap(),
            RelativePhrase::ThisMonth,
        ),
        (
            Regex::new(r"(?i)\brecent(?:ly)?\b").unwrap(),
            RelativePhrase::Recent,
        ),
    ]
});

static DAYS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+days?\s+ago\b").unwrap());

#[derive(Debug, Clone, Copy)]
enum RelativePhrase {
    Yesterday,
    LastWeek,
    ThisMonth,
    Recent,
}

impl RelativePhrase {
    fn to_range(self, now: DateTime<Utc>) -> DateRange {
        match self {
            // The 24-hour window ending one day before the evaluation
            // instant.
            Self::Yesterday => DateRange::new(now - Duration::days(2), now - Duration::days(1)),
            Self::LastWeek => DateRange::new(now - Duration::days(7), now),
            Self::ThisMonth => DateRange::new(now - Duration::days(30), now),
            Self::Recent => DateRange::new(now - Duration::days(7), now),
        }
    }
}

/// Extract the first temporal phrase from `text`, anchored at `now`.
///
/// Returns `None` when no phrase matches. A matched "N days ago" with an
/// out-of-range N (overflow) is ignored rather than failing.
pub fn extract_temporal(text: &str, now: DateTime<Utc>) -> Option<TemporalMatch> {
    // Fixed phrases win over "N days ago" when both appear; the table
    // order is the priority order.
    let mut best: Option<(usize, TemporalMatch)> = None;

    for (pattern, phrase) in PHRASE_PATTERNS.iter() {
        if let Some(m) = pattern.find(text) {
            let candidate = (
                m.start(),
                TemporalMatch {
                    range: phrase.to_range(now),
                    phrase: m.as_str().to_string(),
                },
            );
            if best.as_ref().map_or(true, |(pos, _)| candidate.0 < *pos) {
                best = Some(candidate);
            }
        }
    }

    if best.is_none() {
        if let Some(caps) = DAYS_AGO.captures(text) {
            let whole = caps.get(0).expect("match");
            if let Ok(days) = caps[1].parse::<i64>() {
                if days > 0 && days <= 36_500 {
                    let start = now - Duration::days(days);
                    let end = now - Duration::days(days - 1);
                    best = Some((
                        whole.start(),
                        TemporalMatch {
                            range: DateRange::new(start, end),
                            phrase: whole.as_str().to_string(),
                        },
                    ));
                }
            }
        }
    }

    best.map(|(_, m)| m)
}

/// Strip `phrase` from `text` and collapse the surrounding whitespace.
pub fn strip_phrase(text: &str, phrase: &str) -> String {
    let stripped = match text.find(phrase) {
        Some(pos) => {
            let mut s = String::with_capacity(text.len());
            s.push_str(&text[..pos]);
            s.push(' ');
            s.push_str(&text[pos + phrase.len()..]);
            s
        }
        None => text.to_string(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
