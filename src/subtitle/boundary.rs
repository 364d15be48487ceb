//! Sentence boundary heuristics.
//!
//! Best-effort only: the rules look at the unit just appended, the one that
//! follows it and how much text has piled up, never at grammar.

use super::text::word_count;
use crate::config::SegmentConfig;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Tokens that end in a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "vs.", "etc.", "i.e.", "e.g.", "a.m.", "p.m.", "inc.",
    "corp.", "co.", "ltd.", "llc.", "u.s.", "u.k.", "e.u.", "n.a.t.o.", "jan.", "feb.", "mar.",
    "apr.", "jun.", "jul.", "aug.", "sep.", "oct.", "nov.", "dec.", "mon.", "tue.", "wed.",
    "thu.", "fri.", "sat.", "sun.", "st.", "nd.", "rd.", "th.",
];

/// Words that commonly open a new sentence.
const SENTENCE_STARTERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "i", "you", "he", "she", "it", "we",
    "they", "my", "your", "his", "her", "its", "our", "their", "mine", "yours", "hers", "ours",
    "theirs", "and", "but", "or", "nor", "for", "yet", "so", "because", "although", "however",
    "therefore", "first", "second", "third", "finally", "next", "then", "now", "here", "there",
    "when", "where", "why", "how", "what", "which", "who", "whom", "whose",
];

const STRONG_ENDINGS: &[char] = &['.', '!', '?'];
const WEAK_ENDINGS: &[char] = &[',', ';', ':'];

/// "12." style list numerals.
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.$").expect("Invalid regex"));

/// Granularity of the units being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Word,
    Utterance,
}

/// Everything the classifier needs besides the texts themselves.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryContext<'a> {
    pub kind: UnitKind,
    /// Silence between the current unit's end and the next unit's start.
    pub pause_to_next: Option<Duration>,
    pub config: &'a SegmentConfig,
}

/// Decide whether the sentence being accumulated ends after `current`.
///
/// `accumulated` already includes `current`. Rules are evaluated in order and
/// the first one that applies decides.
pub fn is_boundary(
    accumulated: &str,
    current: &str,
    next: Option<&str>,
    ctx: &BoundaryContext<'_>,
) -> bool {
    let current = current.trim();

    if current.ends_with(STRONG_ENDINGS) {
        let last_token = current
            .split_whitespace()
            .last()
            .unwrap_or(current)
            .to_lowercase();
        return !(ABBREVIATIONS.contains(&last_token.as_str())
            || NUMBERED_RE.is_match(&last_token));
    }

    let words = word_count(accumulated);
    if words > ctx.config.max_sentence_words {
        return true;
    }

    if let Some(next) = next {
        if starts_sentence(next)
            && words > ctx.config.min_sentence_words
            && !current.ends_with(WEAK_ENDINGS)
        {
            return true;
        }
    }

    if ctx.kind == UnitKind::Utterance {
        if let Some(pause) = ctx.pause_to_next {
            if pause > ctx.config.utterance_pause() {
                return true;
            }
        }
    }

    next.is_none()
}

fn starts_sentence(next: &str) -> bool {
    next.split_whitespace()
        .next()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .is_some_and(|w| SENTENCE_STARTERS.contains(&w.as_str()))
}
