use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redub::config::{Config, Stage};
use redub::pipeline::{print_summary, run_pipeline, Collaborators, PipelineConfig};
use redub::subtitle::srt::{read_srt, write_srt};
use redub::subtitle::{format_srt, merge_by_gap, repair_timeline, split_long_spans, TimedSpan};
use redub::synthesize::elevenlabs::ElevenLabsClient;
use redub::synthesize::SynthesisTimelineBuilder;
use redub::transcribe::assemblyai::AssemblyAiClient;
use redub::transcribe::{spans_from_transcript, Transcript, TranscriptDocument};
use redub::translate::gemini::GeminiTranslator;
use redub::translate::{resegment_spans, translate_spans, Translator};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "redub")]
#[command(version, about = "Re-voice videos in another language")]
#[command(
    long_about = "Transcribe speech, regroup it into timed sentences, translate it and synthesize a dubbed audio track aligned to the original timing."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build sentence subtitles from a transcript (.json document or .srt)
    Segment {
        input: PathBuf,
        /// Output subtitle file (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge subtitle entries separated by short gaps
    Merge {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fix overlapping and too-short subtitle entries
    Repair {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Translate a subtitle file
    Translate {
        input: PathBuf,
        /// Target language code (e.g., vi, es, ja)
        #[arg(long)]
        to: Option<String>,
        /// Let the model regroup fragments into sentences first
        #[arg(long)]
        resegment: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a subtitle file to a single aligned WAV track
    Synthesize {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Transcribe, translate and dub a media file
    Run {
        input: PathBuf,
        /// Directory for all generated files
        #[arg(short, long)]
        workdir: PathBuf,
        /// Target language code (defaults to the configured one)
        #[arg(long)]
        to: Option<String>,
        /// Keep the source language
        #[arg(long, conflicts_with = "to")]
        no_translate: bool,
        /// Spoken language of the input (auto-detected when omitted)
        #[arg(short, long)]
        language: Option<String>,
        /// Regroup the transcript with the language model
        #[arg(long)]
        ai_segmentation: bool,
        /// Write the dubbed audio back into the video
        #[arg(long)]
        mux: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn emit_spans(spans: &[TimedSpan], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            write_srt(path, spans)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} entries to {}", spans.len(), path.display());
        }
        None => print!("{}", format_srt(spans)),
    }
    Ok(())
}

fn load_transcript(path: &Path) -> Result<Transcript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let document: TranscriptDocument =
            serde_json::from_str(&content).context("Invalid transcript JSON")?;
        Ok(Transcript::Structured(document))
    } else {
        Ok(Transcript::Srt(content))
    }
}

/// Subtitles ready to render: ordered, non-overlapping, long enough.
fn load_spans_for_synthesis(path: &Path, config: &Config) -> Result<Vec<TimedSpan>> {
    let spans = read_srt(path).context("Failed to read subtitles")?;
    Ok(repair_timeline(spans, &config.repair))
}

fn gemini(config: &Config) -> Result<GeminiTranslator> {
    config
        .validate(Stage::Translate)
        .context("Configuration validation failed")?;
    let key = config.gemini_api_key.clone().unwrap_or_default();
    Ok(GeminiTranslator::new(key).with_model(config.gemini_model.clone()))
}

fn elevenlabs(config: &Config) -> Result<ElevenLabsClient> {
    config
        .validate(Stage::Synthesize)
        .context("Configuration validation failed")?;
    Ok(ElevenLabsClient::new(
        config.elevenlabs_api_key.clone().unwrap_or_default(),
        config.elevenlabs_voice_id.clone().unwrap_or_default(),
    )
    .with_model(config.elevenlabs_model_id.clone())
    .with_sample_rate(config.synthesis.sample_rate))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Segment { input, output } => {
            let transcript = load_transcript(&input)?;
            let spans = spans_from_transcript(&transcript, &config);
            emit_spans(&spans, output.as_deref())?;
        }
        Command::Merge { input, output } => {
            let spans = read_srt(&input).context("Failed to read subtitles")?;
            let merged = merge_by_gap(&spans, &config.gap_merge);
            let merged = repair_timeline(split_long_spans(merged, &config.segment), &config.repair);
            info!("Merged {} entries into {}", spans.len(), merged.len());
            emit_spans(&merged, output.as_deref())?;
        }
        Command::Repair { input, output } => {
            let spans = read_srt(&input).context("Failed to read subtitles")?;
            let repaired = repair_timeline(spans, &config.repair);
            emit_spans(&repaired, output.as_deref())?;
        }
        Command::Translate {
            input,
            to,
            resegment,
            output,
        } => {
            let translator = gemini(&config)?;
            let target = to.unwrap_or_else(|| config.target_language.clone());

            let mut spans = read_srt(&input).context("Failed to read subtitles")?;
            if resegment || config.use_ai_segmentation {
                spans = resegment_spans(&translator, &spans, &config).await;
            }
            let translated = translate_spans(&translator, &spans, &target, &config)
                .await
                .with_context(|| format!("{} translation failed", translator.name()))?;
            if translated.is_empty() {
                warn!("Translation produced no usable subtitles");
            }
            emit_spans(&translated, output.as_deref())?;
        }
        Command::Synthesize { input, output } => {
            let synthesizer = elevenlabs(&config)?;
            let spans = load_spans_for_synthesis(&input, &config)?;

            let (timeline, report) =
                SynthesisTimelineBuilder::new(&synthesizer, config.synthesis.clone())
                    .with_progress(true)
                    .build(&spans)
                    .await;

            timeline
                .write_wav(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(
                "Wrote {} ({} ok, {} failed, {} skipped)",
                output.display(),
                report.succeeded,
                report.failed,
                report.skipped
            );
        }
        Command::Run {
            input,
            workdir,
            to,
            no_translate,
            language,
            ai_segmentation,
            mux,
        } => {
            config
                .validate(Stage::Transcribe)
                .context("Configuration validation failed")?;

            let mut transcriber =
                AssemblyAiClient::new(config.assemblyai_api_key.clone().unwrap_or_default())
                    .with_progress(true);
            if let Some(language) = language {
                transcriber = transcriber.with_language(language);
            }

            let translate_to = if no_translate {
                None
            } else {
                Some(to.unwrap_or_else(|| config.target_language.clone()))
            };
            let ai_segmentation = ai_segmentation || config.use_ai_segmentation;

            let translator = if translate_to.is_some() || ai_segmentation {
                Some(gemini(&config)?)
            } else {
                None
            };
            let synthesizer = elevenlabs(&config)?;

            info!("Input:    {}", input.display());
            info!("Workdir:  {}", workdir.display());
            if let Some(ref target) = translate_to {
                info!("Translate to: {}", target);
            }

            let collaborators = Collaborators {
                transcriber: &transcriber,
                translator: translator.as_ref().map(|t| t as &dyn Translator),
                synthesizer: &synthesizer,
            };
            let pipeline_config = PipelineConfig {
                translate_to,
                ai_segmentation,
                mux,
                ..Default::default()
            };

            let result = run_pipeline(&input, &workdir, collaborators, &config, pipeline_config)
                .await
                .context("Dubbing failed")?;

            print_summary(&result);
        }
    }

    Ok(())
}
