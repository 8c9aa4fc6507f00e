//! Query interpretation: raw text in, normalized query signals out.
//!
//! The interpreter turns a raw query string into residual text for the
//! fuzzy/semantic passes plus auxiliary signals: tag filters, a temporal
//! range, an intent classification, a semantic-eligibility hint, and an
//! inferred category. Malformed syntax is always treated as plain text.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::NoteCategory;
use crate::temporal::{extract_temporal, strip_phrase, DateRange};

/// Intent classification, from fixed prefix patterns checked in priority
/// order; first match wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Create,
    FindSimilar,
    Navigate,
    #[default]
    Search,
}

/// Interpreter output: everything downstream passes need from the raw
/// query string.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedQuery {
    /// Query text with tag tokens and the temporal phrase stripped.
    pub residual: String,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub date_range: Option<DateRange>,
    pub intent: QueryIntent,
    /// Heuristic only: avoids paying for a vector lookup on trivial
    /// queries. Callers may force semantic search regardless.
    pub semantic_eligible: bool,
    pub category: Option<NoteCategory>,
}

/// `#tag` / `-#tag` tokens. Tag names start with a letter.
static TAG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?)#([A-Za-z][A-Za-z0-9_-]*)").unwrap());

/// Words whose presence suggests the query is about meaning, not spelling.
const SIMILARITY_INDICATORS: &[&str] = &[
    "similar", "related", "like", "about", "concept", "meaning", "idea",
];

/// Residual length beyond which a vector lookup is considered worthwhile.
const SEMANTIC_LENGTH_THRESHOLD: usize = 20;

/// Category keyword tables, checked in fixed order; first matching
/// category wins, no stacking.
const CATEGORY_KEYWORDS: &[(NoteCategory, &[&str])] = &[
    (
        NoteCategory::Work,
        &["work", "meeting", "project", "deadline", "standup"],
    ),
    (
        NoteCategory::Personal,
        &["personal", "family", "home", "birthday", "health"],
    ),
    (
        NoteCategory::Research,
        &["research", "study", "paper", "experiment", "hypothesis"],
    ),
];

/// Interpret a raw query string, anchoring temporal phrases at `now`.
pub fn interpret(raw: &str, now: DateTime<Utc>) -> InterpretedQuery {
    let intent = classify_intent(raw);

    // Tag extraction first: matched tokens are stripped from the text
    // used for temporal and fuzzy/semantic matching.
    let mut include_tags = Vec::new();
    let mut exclude_tags = Vec::new();
    let without_tags = TAG_TOKEN
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let tag = caps[2].to_lowercase();
            if &caps[1] == "-" {
                exclude_tags.push(tag);
            } else {
                include_tags.push(tag);
            }
            ""
        })
        .into_owned();

    let (date_range, residual) = match extract_temporal(&without_tags, now) {
        Some(m) => (Some(m.range), strip_phrase(&without_tags, &m.phrase)),
        None => (
            None,
            without_tags.split_whitespace().collect::<Vec<_>>().join(" "),
        ),
    };

    let lower = residual.to_lowercase();
    let semantic_eligible = intent == QueryIntent::FindSimilar
        || residual.chars().count() > SEMANTIC_LENGTH_THRESHOLD
        || lower
            .split_whitespace()
            .any(|word| SIMILARITY_INDICATORS.contains(&word));

    let category = infer_category(&lower);

    InterpretedQuery {
        residual,
        include_tags,
        exclude_tags,
        date_range,
        intent,
        semantic_eligible,
        category,
    }
}

fn classify_intent(raw: &str) -> QueryIntent {
    let lower = raw.trim().to_lowercase();
    if lower.starts_with("create ") || lower.starts_with("new ") || lower.starts_with("add ") {
        QueryIntent::Create
    } else if lower.starts_with("find similar to") {
        QueryIntent::FindSimilar
    } else if lower.starts_with("go to ") || lower.starts_with("open ") {
        QueryIntent::Navigate
    } else {
        QueryIntent::Search
    }
}

fn infer_category(lower_residual: &str) -> Option<NoteCategory> {
    let words: Vec<&str> = lower_residual.split_whitespace().collect();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if words.iter().any(|w| keywords.contains(w)) {
            return Some(*category);
        }
    }
    None
}
