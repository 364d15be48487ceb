pub mod assemblyai;

use crate::config::Config;
use crate::error::Result;
use crate::subtitle::{
    merge_units, merge_utterances, parse_srt_lenient, placeholder_span, repair_timeline,
    split_long_spans, TimedSpan, Unit, UnitKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tracing::{info, warn};

/// A single recognized word.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Word {
    pub text: String,
    #[serde(rename = "start")]
    pub start_ms: u64,
    #[serde(rename = "end")]
    pub end_ms: u64,
}

/// A run of words the provider grouped together, usually per speaker turn.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Utterance {
    pub text: String,
    #[serde(rename = "start")]
    pub start_ms: u64,
    #[serde(rename = "end")]
    pub end_ms: u64,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Structured transcript as returned by a speech-to-text provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TranscriptDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub words: Vec<Word>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub utterances: Vec<Utterance>,
}

/// The two shapes a transcription collaborator may hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// A flat subtitle document.
    Srt(String),
    Structured(TranscriptDocument),
}

/// Speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}

/// Turn a transcript into a repaired sequence of sentence spans.
///
/// Never returns an empty sequence: a transcript with nothing usable yields
/// the placeholder span.
pub fn spans_from_transcript(transcript: &Transcript, config: &Config) -> Vec<TimedSpan> {
    let merged = match transcript {
        Transcript::Structured(doc) => {
            if doc.utterances.is_empty() {
                info!("Assembling sentences from {} words", doc.words.len());
            } else {
                info!(
                    "Assembling sentences from {} utterances",
                    doc.utterances.len()
                );
            }
            merge_utterances(&doc.utterances, &doc.words, &config.segment)
        }
        Transcript::Srt(content) => {
            let parsed = parse_srt_lenient(content);
            info!("Assembling sentences from {} subtitle entries", parsed.len());
            let units: Vec<Unit> = parsed.iter().map(Unit::from).collect();
            merge_units(&units, UnitKind::Utterance, &config.segment)
        }
    };

    let spans = repair_timeline(split_long_spans(merged, &config.segment), &config.repair);

    if spans.is_empty() {
        warn!("Transcript contained no usable speech, using placeholder");
        return vec![placeholder_span()];
    }

    spans
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
