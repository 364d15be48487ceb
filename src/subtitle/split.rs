use super::text::word_count;
use super::{renumber, TimedSpan};
use crate::config::SegmentConfig;
use std::time::Duration;
use tracing::debug;

/// Split text after `.`, `!` or `?` runs followed by whitespace, then glue
/// pieces shorter than `min_chars` onto a neighbour.
pub fn split_sentences(text: &str, min_chars: usize) -> Vec<String> {
    let mut candidates: Vec<&str> = Vec::new();
    let mut from = 0;
    let mut prev_terminal = false;

    for (pos, ch) in text.char_indices() {
        if ch.is_whitespace() && prev_terminal {
            candidates.push(&text[from..pos]);
            from = pos;
        }
        prev_terminal = matches!(ch, '.' | '!' | '?');
    }
    candidates.push(&text[from..]);

    let mut merged: Vec<String> = Vec::new();
    let mut current = String::new();

    for candidate in candidates.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if current.is_empty() {
            current = candidate.to_string();
        } else if current.chars().count() < min_chars {
            current.push(' ');
            current.push_str(candidate);
        } else {
            merged.push(std::mem::take(&mut current));
            current = candidate.to_string();
        }
    }

    if !current.is_empty() {
        match merged.last_mut() {
            Some(prev) if current.chars().count() < min_chars => {
                prev.push(' ');
                prev.push_str(&current);
            }
            _ => merged.push(current),
        }
    }

    merged
}

/// Break a span into its sentences, sharing the time range equally.
///
/// Timing is divided by sentence count, not text length: piece `i` of `n`
/// covers `start + i*D/n .. start + (i+1)*D/n`, rounded down to the
/// millisecond.
pub fn split_span(span: &TimedSpan, config: &SegmentConfig) -> Vec<TimedSpan> {
    let pieces = split_sentences(&span.text, config.split_min_sentence_chars);
    if pieces.len() <= 1 {
        return vec![span.clone()];
    }

    // Whole milliseconds, so the pieces survive a round trip through SubRip
    let n = pieces.len() as u64;
    let total_ms = span.duration().as_millis() as u64;
    let offset = |i: u64| span.start + Duration::from_millis(total_ms * i / n);

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let i = i as u64;
            TimedSpan::new(offset(i), offset(i + 1), text)
        })
        .collect()
}

fn is_oversized(span: &TimedSpan, config: &SegmentConfig) -> bool {
    span.duration() > config.max_span_duration()
        || word_count(&span.text) > config.max_sentence_words
}

/// Split every span that runs too long or holds too many words.
pub fn split_long_spans(spans: Vec<TimedSpan>, config: &SegmentConfig) -> Vec<TimedSpan> {
    let mut result = Vec::with_capacity(spans.len());

    for span in spans {
        if is_oversized(&span, config) {
            let pieces = split_span(&span, config);
            debug!(
                "Split {:.1}s span into {} pieces",
                span.duration().as_secs_f64(),
                pieces.len()
            );
            result.extend(pieces);
        } else {
            result.push(span);
        }
    }

    renumber(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const S1: &str = "The first sentence talks about the weather outside today.";
    const S2: &str = "The second one describes what we had for lunch at noon.";
    const S3: &str = "And the third explains why we all went home so early.";

    #[test]
    fn test_split_sentences() {
        let text = format!("{S1} {S2} {S3}");
        assert_eq!(split_sentences(&text, 50), vec![S1, S2, S3]);
    }

    #[test]
    fn test_split_sentences_glues_short_pieces() {
        let pieces = split_sentences("Yes. No. Maybe so. We will see about that later.", 10);
        assert_eq!(pieces, vec!["Yes. No. Maybe so.", "We will see about that later."]);
    }

    #[test]
    fn test_split_sentences_short_tail_joins_previous() {
        let text = format!("{S1} Ok.");
        assert_eq!(split_sentences(&text, 50), vec![format!("{S1} Ok.")]);
    }

    #[test]
    fn test_split_sentences_no_terminal_whitespace() {
        assert_eq!(split_sentences("version 1.5 is out", 50), vec!["version 1.5 is out"]);
    }

    #[test]
    fn test_split_span_exact_thirds() {
        let span = TimedSpan::new(
            Duration::ZERO,
            Duration::from_secs(15),
            format!("{S1} {S2} {S3}"),
        );

        let pieces = split_span(&span, &SegmentConfig::default());

        assert_eq!(pieces.len(), 3);
        let bounds: Vec<(u64, u64)> = pieces
            .iter()
            .map(|p| (p.start.as_millis() as u64, p.end.as_millis() as u64))
            .collect();
        assert_eq!(bounds, vec![(0, 5000), (5000, 10_000), (10_000, 15_000)]);
        assert_eq!(pieces[1].text, S2);
    }

    #[test]
    fn test_split_span_offset_start() {
        let span = TimedSpan::new(
            Duration::from_secs(10),
            Duration::from_secs(30),
            format!("{S1} {S2}"),
        );

        let pieces = split_span(&span, &SegmentConfig::default());

        assert_eq!(pieces[0].start, Duration::from_secs(10));
        assert_eq!(pieces[0].end, Duration::from_secs(20));
        assert_eq!(pieces[1].end, Duration::from_secs(30));
    }

    #[test]
    fn test_split_span_whole_millis() {
        let span = TimedSpan::new(
            Duration::ZERO,
            Duration::from_secs(10),
            format!("{S1} {S2} {S3}"),
        );

        let pieces = split_span(&span, &SegmentConfig::default());

        assert_eq!(pieces[0].end, Duration::from_millis(3333));
        assert_eq!(pieces[1].start, Duration::from_millis(3333));
        assert_eq!(pieces[1].end, Duration::from_millis(6666));
        assert_eq!(pieces[2].end, Duration::from_secs(10));
    }

    #[test]
    fn test_split_long_spans_leaves_short_spans() {
        let spans = vec![
            TimedSpan::new(Duration::ZERO, Duration::from_secs(4), format!("{S1} {S2}")),
            TimedSpan::new(
                Duration::from_secs(4),
                Duration::from_secs(24),
                format!("{S1} {S2}"),
            ),
        ];

        let result = split_long_spans(spans, &SegmentConfig::default());

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].text, format!("{S1} {S2}"));
        assert_eq!(result[1].start, Duration::from_secs(4));
        assert_eq!(result[2].start, Duration::from_secs(14));
        assert_eq!(result[2].index, 3);
    }

    #[test]
    fn test_split_long_spans_by_word_count() {
        let config = SegmentConfig {
            max_sentence_words: 10,
            ..Default::default()
        };
        let spans = vec![TimedSpan::new(
            Duration::ZERO,
            Duration::from_secs(6),
            format!("{S1} {S2}"),
        )];

        let result = split_long_spans(spans, &config);

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].start, Duration::from_secs(3));
    }
}
