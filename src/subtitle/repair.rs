use super::{renumber, TimedSpan};
use crate::config::RepairConfig;
use tracing::debug;

/// Fix overlaps and too-short durations in one left-to-right sweep.
///
/// Spans with blank text are dropped and the rest are ordered by start time.
/// Each span is first clamped to end `overlap_gap` before its successor
/// starts, then stretched to `min_duration`. The stretch is not re-checked
/// against the successor, so a span squeezed below the minimum by a close
/// neighbour can still overlap it afterwards.
pub fn repair_timeline(spans: Vec<TimedSpan>, config: &RepairConfig) -> Vec<TimedSpan> {
    let mut spans: Vec<TimedSpan> = spans
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .collect();
    spans.sort_by_key(|s| s.start);

    let mut clamped = 0;
    let mut extended = 0;

    for i in 0..spans.len() {
        if let Some(next_start) = spans.get(i + 1).map(|n| n.start) {
            if spans[i].end > next_start {
                spans[i].end = next_start.saturating_sub(config.overlap_gap());
                clamped += 1;
            }
        }

        let span = &mut spans[i];
        if span.end.saturating_sub(span.start) < config.min_duration() {
            span.end = span.start + config.min_duration();
            extended += 1;
        }
    }

    if clamped > 0 || extended > 0 {
        debug!(
            "Timeline repair: {} overlaps clamped, {} spans extended",
            clamped, extended
        );
    }

    renumber(&mut spans);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn span(start_ms: u64, end_ms: u64, text: &str) -> TimedSpan {
        TimedSpan::new(
            Duration::from_millis(start_ms),
            Duration::from_millis(end_ms),
            text,
        )
    }

    fn ms(d: Duration) -> u64 {
        d.as_millis() as u64
    }

    #[test]
    fn test_overlap_clamped() {
        let spans = vec![span(0, 3000, "One"), span(2500, 5000, "Two")];

        let result = repair_timeline(spans, &RepairConfig::default());

        assert_eq!(ms(result[0].end), 2400);
        assert_eq!(ms(result[1].start), 2500);
    }

    #[test]
    fn test_short_span_extended() {
        let spans = vec![span(1000, 1200, "Hi"), span(5000, 7000, "There")];

        let result = repair_timeline(spans, &RepairConfig::default());

        assert_eq!(ms(result[0].end), 1500);
        assert_eq!(ms(result[1].end), 7000);
    }

    #[test]
    fn test_inverted_span_extended() {
        let result = repair_timeline(vec![span(3000, 2000, "Oops")], &RepairConfig::default());
        assert_eq!(ms(result[0].end), 3500);
    }

    #[test]
    fn test_residual_overlap_is_kept() {
        // Clamping leaves 100ms, extension pushes it past the next start
        let spans = vec![span(1000, 1400, "Quick"), span(1200, 3000, "Next")];

        let result = repair_timeline(spans, &RepairConfig::default());

        assert_eq!(ms(result[0].end), 1500);
        assert!(result[0].end > result[1].start);
    }

    #[test]
    fn test_blank_spans_dropped_and_renumbered() {
        let spans = vec![span(0, 1000, "One"), span(1000, 2000, "  "), span(2000, 3000, "Three")];

        let result = repair_timeline(spans, &RepairConfig::default());

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].text, "Three");
        assert_eq!(result[1].index, 2);
    }

    #[test]
    fn test_unordered_input_sorted() {
        let spans = vec![span(4000, 6000, "Later"), span(0, 2000, "Sooner")];

        let result = repair_timeline(spans, &RepairConfig::default());

        assert_eq!(result[0].text, "Sooner");
        assert_eq!(result[0].index, 1);
    }

    #[test]
    fn test_ordering_invariant_holds() {
        let spans = vec![
            span(0, 2600, "A"),
            span(2000, 4000, "B"),
            span(3900, 4100, "C"),
            span(6000, 9000, "D"),
        ];
        let config = RepairConfig::default();

        let result = repair_timeline(spans, &config);

        for pair in result.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?}", pair);
        }
        for span in &result {
            assert!(span.duration() >= config.min_duration());
        }
    }
}
