use super::boundary::{is_boundary, BoundaryContext, UnitKind};
use super::text::{clean_sentence, collapse_whitespace, word_count};
use super::{renumber, TimedSpan};
use crate::config::{GapMergeConfig, SegmentConfig};
use crate::transcribe::{Utterance, Word};
use std::time::Duration;
use tracing::debug;

/// A timed piece of text fed to the merger: a word, an utterance or an
/// already-parsed subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub text: String,
    pub start: Duration,
    pub end: Duration,
}

impl From<&Word> for Unit {
    fn from(word: &Word) -> Self {
        Self {
            text: word.text.clone(),
            start: Duration::from_millis(word.start_ms),
            end: Duration::from_millis(word.end_ms),
        }
    }
}

impl From<&Utterance> for Unit {
    fn from(utterance: &Utterance) -> Self {
        Self {
            text: utterance.text.clone(),
            start: Duration::from_millis(utterance.start_ms),
            end: Duration::from_millis(utterance.end_ms),
        }
    }
}

impl From<&TimedSpan> for Unit {
    fn from(span: &TimedSpan) -> Self {
        Self {
            text: span.text.clone(),
            start: span.start,
            end: span.end,
        }
    }
}

/// Working state while a sentence is being assembled.
#[derive(Debug, Default)]
struct SentenceAccumulator {
    text: String,
    start: Option<Duration>,
    end: Duration,
}

impl SentenceAccumulator {
    fn push(&mut self, text: &str, unit: &Unit) {
        if self.start.is_none() {
            self.start = Some(unit.start);
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
        self.end = unit.end;
    }

    /// Hand over the accumulated sentence and reset to empty.
    fn flush(&mut self) -> Option<(String, Duration, Duration)> {
        let acc = std::mem::take(self);
        acc.start.map(|start| (acc.text, start, acc.end))
    }
}

/// Assemble sentence-level spans from consecutive units.
///
/// Word units have their text cleaned and anything shorter than
/// `min_sentence_chars` dropped as noise. Afterwards, spans below
/// `min_sentence_words` are absorbed into their predecessor.
pub fn merge_units(units: &[Unit], kind: UnitKind, config: &SegmentConfig) -> Vec<TimedSpan> {
    let units: Vec<&Unit> = units.iter().filter(|u| !u.text.trim().is_empty()).collect();

    let mut sentences = Vec::new();
    let mut acc = SentenceAccumulator::default();

    for (i, unit) in units.iter().enumerate() {
        let text = unit.text.trim();
        acc.push(text, unit);

        let next = units.get(i + 1);
        let ctx = BoundaryContext {
            kind,
            pause_to_next: next.map(|n| n.start.saturating_sub(unit.end)),
            config,
        };

        if is_boundary(&acc.text, text, next.map(|n| n.text.trim()), &ctx) {
            if let Some(sentence) = acc.flush() {
                push_sentence(&mut sentences, sentence, kind, config);
            }
        }
    }

    // An abbreviation on the final unit leaves text behind
    if let Some(sentence) = acc.flush() {
        push_sentence(&mut sentences, sentence, kind, config);
    }

    debug!(
        "Assembled {} sentences from {} {:?} units",
        sentences.len(),
        units.len(),
        kind
    );

    let mut spans = absorb_short_spans(sentences, config.min_sentence_words);
    renumber(&mut spans);
    spans
}

fn push_sentence(
    sentences: &mut Vec<TimedSpan>,
    (text, start, end): (String, Duration, Duration),
    kind: UnitKind,
    config: &SegmentConfig,
) {
    let text = match kind {
        UnitKind::Word => clean_sentence(&text),
        UnitKind::Utterance => collapse_whitespace(&text),
    };

    if text.is_empty() {
        return;
    }
    if kind == UnitKind::Word && text.chars().count() < config.min_sentence_chars {
        debug!("Dropping noise fragment {:?}", text);
        return;
    }

    sentences.push(TimedSpan::new(start, end, text));
}

/// Word-level strategy.
pub fn merge_words(words: &[Word], config: &SegmentConfig) -> Vec<TimedSpan> {
    let units: Vec<Unit> = words.iter().map(Unit::from).collect();
    merge_units(&units, UnitKind::Word, config)
}

/// Utterance-level strategy, falling back to words when the provider
/// returned no utterances.
pub fn merge_utterances(
    utterances: &[Utterance],
    words: &[Word],
    config: &SegmentConfig,
) -> Vec<TimedSpan> {
    if utterances.is_empty() {
        debug!("No utterances available, using word-level assembly");
        return merge_words(words, config);
    }

    let units: Vec<Unit> = utterances.iter().map(Unit::from).collect();
    merge_units(&units, UnitKind::Utterance, config)
}

/// Fold spans shorter than `min_words` into the previous span.
///
/// The first span has no predecessor and is kept whatever its length.
pub fn absorb_short_spans(spans: Vec<TimedSpan>, min_words: usize) -> Vec<TimedSpan> {
    let mut result: Vec<TimedSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        match result.last_mut() {
            Some(prev) if word_count(&span.text) < min_words => {
                prev.text = format!("{} {}", prev.text.trim(), span.text.trim());
                prev.end = span.end;
            }
            _ => result.push(span),
        }
    }

    result
}

/// Group spans separated by short gaps, ignoring sentence structure.
///
/// A span joins the current group when the gap to the group's last span is
/// at most `max_gap`, or while the group is still shorter than
/// `min_group_duration`.
pub fn merge_by_gap(spans: &[TimedSpan], config: &GapMergeConfig) -> Vec<TimedSpan> {
    let mut groups: Vec<Vec<&TimedSpan>> = Vec::new();

    for span in spans {
        if let Some(group) = groups.last_mut() {
            let first = group[0];
            let last = group[group.len() - 1];
            let gap = span.start.saturating_sub(last.end);
            let group_duration = last.end.saturating_sub(first.start);

            if gap <= config.max_gap() || group_duration < config.min_group_duration() {
                group.push(span);
                continue;
            }
        }
        groups.push(vec![span]);
    }

    let mut merged: Vec<TimedSpan> = groups
        .into_iter()
        .map(|group| {
            let text = group
                .iter()
                .map(|s| s.text.trim())
                .collect::<Vec<_>>()
                .join(" ");
            TimedSpan::new(group[0].start, group[group.len() - 1].end, text)
        })
        .collect();

    renumber(&mut merged);
    merged
}
