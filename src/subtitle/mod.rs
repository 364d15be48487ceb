pub mod boundary;
pub mod merge;
pub mod repair;
pub mod split;
pub mod srt;
pub mod text;

pub use boundary::{is_boundary, BoundaryContext, UnitKind};
pub use merge::{absorb_short_spans, merge_by_gap, merge_units, merge_utterances, merge_words, Unit};
pub use repair::repair_timeline;
pub use split::{split_long_spans, split_sentences, split_span};
pub use srt::{format_srt, normalize_srt, parse_srt, parse_srt_lenient};

use std::time::Duration;

/// A contiguous run of text pinned to the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedSpan {
    /// 1-based position, reassigned on every serialization.
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl TimedSpan {
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            index: 0,
            start,
            end,
            text: text.into(),
        }
    }

    /// Get the duration of this span (zero when degenerate).
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// Zero or negative duration, or nothing to say.
    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start || self.text.trim().is_empty()
    }
}

/// Re-number spans sequentially starting from 1.
pub fn renumber(spans: &mut [TimedSpan]) {
    for (i, span) in spans.iter_mut().enumerate() {
        span.index = i + 1;
    }
}

/// Stand-in for a transcript with nothing usable in it.
pub fn placeholder_span() -> TimedSpan {
    TimedSpan {
        index: 1,
        start: Duration::ZERO,
        end: Duration::from_secs(5),
        text: "[No audio detected]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_duration() {
        let span = TimedSpan::new(Duration::from_millis(1500), Duration::from_millis(4000), "Hi");
        assert_eq!(span.duration(), Duration::from_millis(2500));

        let inverted = TimedSpan::new(Duration::from_secs(4), Duration::from_secs(3), "Hi");
        assert_eq!(inverted.duration(), Duration::ZERO);
        assert!(inverted.is_degenerate());
    }

    #[test]
    fn test_blank_text_is_degenerate() {
        let span = TimedSpan::new(Duration::ZERO, Duration::from_secs(1), "   ");
        assert!(span.is_degenerate());
    }

    #[test]
    fn test_renumber() {
        let mut spans = vec![
            TimedSpan::new(Duration::ZERO, Duration::from_secs(1), "First"),
            TimedSpan::new(Duration::from_secs(2), Duration::from_secs(3), "Second"),
        ];
        spans[0].index = 7;
        spans[1].index = 3;

        renumber(&mut spans);

        assert_eq!(spans[0].index, 1);
        assert_eq!(spans[1].index, 2);
    }
}
