pub mod elevenlabs;

use crate::audio::{AudioClip, Timeline};
use crate::config::SynthesisConfig;
use crate::error::Result;
use crate::subtitle::text::{is_numeric_only, strip_enumeration};
use crate::subtitle::TimedSpan;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Text-to-speech collaborator. Receives plain text only; placement on the
/// timeline is the caller's job.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn render(&self, text: &str) -> Result<AudioClip>;
    fn name(&self) -> &'static str;
}

/// What happened to one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanOutcome {
    Rendered,
    /// Synthesis failed and silence stands in for the span.
    Failed,
    /// Nothing speakable after cleanup.
    Skipped,
}

/// Per-span notification passed to the progress callback.
#[derive(Debug, Clone)]
pub struct SynthesisProgress {
    /// 1-based position in the run.
    pub position: usize,
    pub total: usize,
    pub outcome: SpanOutcome,
    pub succeeded: usize,
    pub failed: usize,
}

/// Aggregate outcome of a synthesis run.
#[derive(Debug, Clone, Default)]
pub struct SynthesisReport {
    pub total_spans: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl SynthesisReport {
    /// Spans were attempted but none produced audio.
    pub fn is_silent(&self) -> bool {
        self.succeeded == 0 && self.failed > 0
    }
}

type ProgressCallback<'a> = Box<dyn FnMut(&SynthesisProgress) + Send + 'a>;

/// Renders spans one at a time onto a shared timeline.
///
/// Spans are processed strictly in order since every overlay mutates the
/// same buffer. A span whose synthesis fails is covered by silence and the
/// run carries on.
pub struct SynthesisTimelineBuilder<'a> {
    synthesizer: &'a dyn Synthesizer,
    config: SynthesisConfig,
    show_progress: bool,
    on_progress: Option<ProgressCallback<'a>>,
}

impl<'a> SynthesisTimelineBuilder<'a> {
    pub fn new(synthesizer: &'a dyn Synthesizer, config: SynthesisConfig) -> Self {
        Self {
            synthesizer,
            config,
            show_progress: false,
            on_progress: None,
        }
    }

    /// Enable or disable progress bar display.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Register a callback invoked once per span.
    pub fn on_progress(mut self, callback: impl FnMut(&SynthesisProgress) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Render every span and return the finished timeline.
    ///
    /// The timeline lasts until the latest span end plus the trailing pad.
    pub async fn build(mut self, spans: &[TimedSpan]) -> (Timeline, SynthesisReport) {
        let started = Instant::now();
        let last_end = spans.iter().map(|s| s.end).max().unwrap_or(Duration::ZERO);
        let mut timeline =
            Timeline::silent(last_end + self.config.trailing_pad(), self.config.sample_rate);

        let total = spans.len();
        let mut report = SynthesisReport {
            total_spans: total,
            ..Default::default()
        };

        info!(
            "Synthesizing {} spans with {} ({:.1}s timeline)",
            total,
            self.synthesizer.name(),
            timeline.duration().as_secs_f64()
        );

        let progress_bar = if self.show_progress && total > 0 {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} spans ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for (i, span) in spans.iter().enumerate() {
            let outcome = self.render_span(span, &mut timeline).await;
            match outcome {
                SpanOutcome::Rendered => report.succeeded += 1,
                SpanOutcome::Failed => report.failed += 1,
                SpanOutcome::Skipped => report.skipped += 1,
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
            if let Some(callback) = self.on_progress.as_mut() {
                callback(&SynthesisProgress {
                    position: i + 1,
                    total,
                    outcome,
                    succeeded: report.succeeded,
                    failed: report.failed,
                });
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Synthesis complete");
        }

        report.duration = started.elapsed();

        if report.is_silent() {
            warn!(
                "All {} synthesis attempts failed, output audio is silent",
                report.failed
            );
        } else {
            info!(
                "Synthesis complete: {} succeeded, {} failed, {} skipped in {:.1}s",
                report.succeeded,
                report.failed,
                report.skipped,
                report.duration.as_secs_f64()
            );
        }

        (timeline, report)
    }

    async fn render_span(&self, span: &TimedSpan, timeline: &mut Timeline) -> SpanOutcome {
        let text = strip_enumeration(&span.text);
        if text.is_empty() || is_numeric_only(&text) {
            debug!("Span {}: nothing to say, skipping", span.index);
            return SpanOutcome::Skipped;
        }

        match self.synthesizer.render(&text).await {
            Ok(clip) => {
                debug!(
                    "Span {}: {:.2}s clip at {:.2}s",
                    span.index,
                    clip.duration().as_secs_f64(),
                    span.start.as_secs_f64()
                );
                timeline.overlay(&clip, span.start);
                SpanOutcome::Rendered
            }
            Err(e) => {
                warn!("Span {}: synthesis failed, inserting silence: {}", span.index, e);
                let silence = AudioClip::silent(span.duration(), timeline.sample_rate());
                timeline.overlay(&silence, span.start);
                SpanOutcome::Failed
            }
        }
    }
}

/// Render spans with default reporting.
pub async fn build_timeline(
    synthesizer: &dyn Synthesizer,
    spans: &[TimedSpan],
    config: &SynthesisConfig,
) -> (Timeline, SynthesisReport) {
    SynthesisTimelineBuilder::new(synthesizer, config.clone())
        .build(spans)
        .await
}
