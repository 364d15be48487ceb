pub mod gemini;

use crate::config::{Config, GapMergeConfig};
use crate::error::Result;
use crate::subtitle::text::clean_ai_response;
use crate::subtitle::{
    format_srt, merge_by_gap, parse_srt_lenient, renumber, repair_timeline, split_long_spans,
    TimedSpan,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Spans sent per AI re-segmentation request.
pub const RESEGMENT_CHUNK_SIZE: usize = 200;

/// Language-model collaborator working on whole subtitle documents.
///
/// Both operations take and return serialized SubRip text. Replies are
/// treated as untrusted and re-validated by the caller.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_document(&self, srt: &str, target_lang: &str) -> Result<String>;
    async fn resegment_document(&self, srt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Translate spans through the collaborator and bring the reply back into
/// shape.
///
/// Provider failures are returned as errors. A reply that cannot be read as
/// subtitles yields an empty sequence.
pub async fn translate_spans(
    translator: &dyn Translator,
    spans: &[TimedSpan],
    target_lang: &str,
    config: &Config,
) -> Result<Vec<TimedSpan>> {
    if spans.is_empty() {
        return Ok(Vec::new());
    }

    info!(
        "Translating {} spans to {} with {}",
        spans.len(),
        target_lang,
        translator.name()
    );

    let reply = translator
        .translate_document(&format_srt(spans), target_lang)
        .await?;
    let translated = parse_srt_lenient(&clean_ai_response(&reply));

    if translated.is_empty() {
        warn!("{} returned no readable subtitles", translator.name());
        return Ok(Vec::new());
    }
    if translated.len() != spans.len() {
        debug!(
            "Translation changed span count: {} -> {}",
            spans.len(),
            translated.len()
        );
    }

    let spans = split_long_spans(translated, &config.segment);
    Ok(repair_timeline(spans, &config.repair))
}

/// Ask the collaborator to regroup fragments into full sentences.
///
/// Works in chunks of [`RESEGMENT_CHUNK_SIZE`]; a chunk whose request fails
/// or whose reply is unreadable is merged locally by gap instead.
pub async fn resegment_spans(
    translator: &dyn Translator,
    spans: &[TimedSpan],
    config: &Config,
) -> Vec<TimedSpan> {
    let fallback = GapMergeConfig::ai_fallback();
    let mut result = Vec::with_capacity(spans.len());

    for (n, chunk) in spans.chunks(RESEGMENT_CHUNK_SIZE).enumerate() {
        debug!("Re-segmenting chunk {} ({} spans)", n + 1, chunk.len());

        let mut chunk = chunk.to_vec();
        renumber(&mut chunk);

        let regrouped = match translator.resegment_document(&format_srt(&chunk)).await {
            Ok(reply) => parse_srt_lenient(&clean_ai_response(&reply)),
            Err(e) => {
                warn!("Re-segmentation of chunk {} failed: {}", n + 1, e);
                Vec::new()
            }
        };

        if regrouped.is_empty() {
            warn!("Merging chunk {} locally by gap", n + 1);
            result.extend(merge_by_gap(&chunk, &fallback));
        } else {
            result.extend(regrouped);
        }
    }

    info!(
        "Re-segmentation: {} spans -> {} spans",
        spans.len(),
        result.len()
    );

    let result = split_long_spans(result, &config.segment);
    repair_timeline(result, &config.repair)
}
