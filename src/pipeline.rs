use crate::audio::{extract_audio, has_audio_stream, is_video_file, replace_audio};
use crate::config::Config;
use crate::error::{RedubError, Result};
use crate::subtitle::srt::write_srt;
use crate::subtitle::TimedSpan;
use crate::synthesize::{SynthesisReport, SynthesisTimelineBuilder, Synthesizer};
use crate::transcribe::{spans_from_transcript, Transcriber, Transcript, TranscriptDocument};
use crate::translate::{resegment_spans, translate_spans, Translator};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub const SOURCE_SRT: &str = "source.srt";
pub const TRANSLATED_SRT: &str = "translated.srt";
pub const DUBBED_WAV: &str = "dubbed.wav";
pub const DUBBED_VIDEO: &str = "dubbed.mp4";

/// The external services a run talks to.
pub struct Collaborators<'a> {
    pub transcriber: &'a dyn Transcriber,
    /// Needed for translation and AI re-segmentation.
    pub translator: Option<&'a dyn Translator>,
    pub synthesizer: &'a dyn Synthesizer,
}

/// Configuration for a dubbing run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target language for translation (optional).
    pub translate_to: Option<String>,
    /// Let the language model regroup the transcript before translation.
    pub ai_segmentation: bool,
    /// Mux the dubbed audio back into the input video.
    pub mux: bool,
    /// Extract a small mono track from video inputs before uploading.
    pub extract_audio: bool,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            translate_to: None,
            ai_segmentation: false,
            mux: false,
            extract_audio: true,
            show_progress: true,
        }
    }
}

/// Statistics from a dubbing run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub transcription_time: Duration,
    pub translation_time: Duration,
    pub synthesis_time: Duration,
    /// Spans assembled from the transcript.
    pub source_spans: usize,
    /// Spans handed to synthesis.
    pub output_spans: usize,
    pub synthesis: SynthesisReport,
    /// Provider used for transcription.
    pub transcriber: String,
}

/// Result of a dubbing run.
#[derive(Debug)]
pub struct PipelineResult {
    pub source_srt: PathBuf,
    pub translated_srt: Option<PathBuf>,
    pub audio_path: PathBuf,
    pub video_path: Option<PathBuf>,
    /// Spans the audio was rendered from.
    pub spans: Vec<TimedSpan>,
    pub stats: PipelineStats,
}

/// Dub a media file end to end.
///
/// 1. Transcribes the input
/// 2. Assembles, splits and repairs sentence spans
/// 3. Optionally re-segments and translates them
/// 4. Synthesizes speech onto a single timeline
///
/// All artifacts land in `workdir`.
pub async fn run_pipeline(
    input: &Path,
    workdir: &Path,
    collaborators: Collaborators<'_>,
    config: &Config,
    pipeline_config: PipelineConfig,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(RedubError::FileNotFound(input.display().to_string()));
    }
    if (pipeline_config.translate_to.is_some() || pipeline_config.ai_segmentation)
        && collaborators.translator.is_none()
    {
        return Err(RedubError::Config(
            "Translation and AI segmentation need a translator".to_string(),
        ));
    }

    fs::create_dir_all(workdir)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Transcription
    // ═══════════════════════════════════════════════════════════════════════
    info!(
        "Stage 1/4: Transcribing {} with {}",
        input.display(),
        collaborators.transcriber.name()
    );
    let transcription_start = Instant::now();
    let transcript = transcribe_input(input, collaborators.transcriber, &pipeline_config).await?;
    let transcription_time = transcription_start.elapsed();

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Segmentation
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 2/4: Assembling sentences");
    let spans = spans_from_transcript(&transcript, config);
    let source_spans = spans.len();

    let source_srt = workdir.join(SOURCE_SRT);
    write_srt(&source_srt, &spans)?;
    info!("Wrote {} source spans to {}", source_spans, source_srt.display());

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 3: Re-segmentation and translation
    // ═══════════════════════════════════════════════════════════════════════
    let translation_start = Instant::now();
    let mut spans = spans;
    let mut translated_srt = None;

    if let Some(translator) = collaborators.translator {
        if pipeline_config.ai_segmentation {
            info!("Stage 3/4: Re-segmenting with {}", translator.name());
            spans = resegment_spans(translator, &spans, config).await;
        }

        if let Some(ref target) = pipeline_config.translate_to {
            info!("Stage 3/4: Translating to {}", target);
            spans = translate_spans(translator, &spans, target, config).await?;
            if spans.is_empty() {
                warn!("Translation produced no usable spans, the dub will be silent");
            }

            let path = workdir.join(TRANSLATED_SRT);
            write_srt(&path, &spans)?;
            translated_srt = Some(path);
        }
    } else {
        debug!("Stage 3/4: No translator configured, skipping");
    }
    let translation_time = translation_start.elapsed();

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 4: Synthesis
    // ═══════════════════════════════════════════════════════════════════════
    info!(
        "Stage 4/4: Synthesizing {} spans with {}",
        spans.len(),
        collaborators.synthesizer.name()
    );
    let synthesis_start = Instant::now();

    let (timeline, report) =
        SynthesisTimelineBuilder::new(collaborators.synthesizer, config.synthesis.clone())
            .with_progress(pipeline_config.show_progress)
            .build(&spans)
            .await;

    let audio_path = workdir.join(DUBBED_WAV);
    timeline.write_wav(&audio_path)?;
    let synthesis_time = synthesis_start.elapsed();

    let video_path = if pipeline_config.mux && is_video_file(input) {
        let path = workdir.join(DUBBED_VIDEO);
        replace_audio(input, &audio_path, &path)?;
        Some(path)
    } else {
        None
    };

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        transcription_time,
        translation_time,
        synthesis_time,
        source_spans,
        output_spans: spans.len(),
        synthesis: report,
        transcriber: collaborators.transcriber.name().to_string(),
    };

    Ok(PipelineResult {
        source_srt,
        translated_srt,
        audio_path,
        video_path,
        spans,
        stats,
    })
}

/// Transcribe, first reducing video inputs to a small mono track.
async fn transcribe_input(
    input: &Path,
    transcriber: &dyn Transcriber,
    pipeline_config: &PipelineConfig,
) -> Result<Transcript> {
    if !(pipeline_config.extract_audio && is_video_file(input)) {
        return transcriber.transcribe(input).await;
    }

    if !has_audio_stream(input)? {
        warn!("{} has no audio stream", input.display());
        return Ok(Transcript::Structured(TranscriptDocument::default()));
    }

    let temp_dir = TempDir::new()?;
    let audio_path = temp_dir.path().join("source.wav");
    extract_audio(input, &audio_path)?;
    debug!("Using extracted audio {:?}", audio_path);

    transcriber.transcribe(&audio_path).await
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    let stats = &result.stats;

    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                         Dubbing Complete                       ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Subtitles:  {}", result.source_srt.display());
    if let Some(ref path) = result.translated_srt {
        println!("  Translated: {}", path.display());
    }
    println!("  Audio:      {}", result.audio_path.display());
    if let Some(ref path) = result.video_path {
        println!("  Video:      {}", path.display());
    }
    println!("  Provider:   {}", stats.transcriber);
    println!(
        "  Spans:      {} source, {} dubbed",
        stats.source_spans, stats.output_spans
    );
    println!(
        "  Speech:     {} ok, {} failed, {} skipped",
        stats.synthesis.succeeded, stats.synthesis.failed, stats.synthesis.skipped
    );
    println!();
    println!("  Timing:");
    println!(
        "    Transcribe:  {:.2}s",
        stats.transcription_time.as_secs_f64()
    );
    println!(
        "    Translate:   {:.2}s",
        stats.translation_time.as_secs_f64()
    );
    println!(
        "    Synthesize:  {:.2}s",
        stats.synthesis_time.as_secs_f64()
    );
    println!("    Total:       {:.2}s", stats.total_time.as_secs_f64());
    if stats.synthesis.is_silent() {
        println!();
        println!("  Warning: every synthesis attempt failed, the audio is silent");
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
