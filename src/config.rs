use crate::error::{RedubError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Thresholds for sentence assembly and splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Spans with fewer words are absorbed into the previous span (default: 20).
    pub min_sentence_words: usize,
    /// Accumulations longer than this are force-broken (default: 150).
    pub max_sentence_words: usize,
    /// Pause between utterances that closes a sentence (default: 1500ms).
    pub utterance_pause_ms: u64,
    /// Word-level sentences shorter than this are dropped as noise (default: 5).
    pub min_sentence_chars: usize,
    /// Split candidates shorter than this are folded into a neighbour (default: 50).
    pub split_min_sentence_chars: usize,
    /// Spans longer than this are re-split (default: 15s).
    pub max_span_duration_ms: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_sentence_words: 20,
            max_sentence_words: 150,
            utterance_pause_ms: 1500,
            min_sentence_chars: 5,
            split_min_sentence_chars: 50,
            max_span_duration_ms: 15_000,
        }
    }
}

impl SegmentConfig {
    pub fn utterance_pause(&self) -> Duration {
        Duration::from_millis(self.utterance_pause_ms)
    }

    pub fn max_span_duration(&self) -> Duration {
        Duration::from_millis(self.max_span_duration_ms)
    }
}

/// Timeline repair thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Minimum span duration (default: 500ms).
    pub min_duration_ms: u64,
    /// Gap left before the next span when clamping an overlap (default: 100ms).
    pub overlap_gap_ms: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 500,
            overlap_gap_ms: 100,
        }
    }
}

impl RepairConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    pub fn overlap_gap(&self) -> Duration {
        Duration::from_millis(self.overlap_gap_ms)
    }
}

/// Gap-based grouping used when AI re-segmentation is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapMergeConfig {
    /// Consecutive spans closer than this are grouped (default: 1s).
    pub max_gap_ms: u64,
    /// Groups shorter than this keep absorbing spans regardless of gap (default: 2s).
    pub min_group_duration_ms: u64,
}

impl Default for GapMergeConfig {
    fn default() -> Self {
        Self {
            max_gap_ms: 1000,
            min_group_duration_ms: 2000,
        }
    }
}

impl GapMergeConfig {
    /// Thresholds used for a chunk whose AI re-segmentation failed.
    pub fn ai_fallback() -> Self {
        Self {
            max_gap_ms: 1000,
            min_group_duration_ms: 5000,
        }
    }

    pub fn max_gap(&self) -> Duration {
        Duration::from_millis(self.max_gap_ms)
    }

    pub fn min_group_duration(&self) -> Duration {
        Duration::from_millis(self.min_group_duration_ms)
    }
}

/// Synthesis timeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Silence appended after the last span (default: 1s).
    pub trailing_pad_ms: u64,
    /// Sample rate of the rendered timeline (default: 24000 Hz).
    pub sample_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            trailing_pad_ms: 1000,
            sample_rate: 24_000,
        }
    }
}

impl SynthesisConfig {
    pub fn trailing_pad(&self) -> Duration {
        Duration::from_millis(self.trailing_pad_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assemblyai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
    pub elevenlabs_model_id: String,
    pub gemini_model: String,
    pub target_language: String,
    pub use_ai_segmentation: bool,
    pub segment: SegmentConfig,
    pub repair: RepairConfig,
    pub gap_merge: GapMergeConfig,
    pub synthesis: SynthesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assemblyai_api_key: None,
            gemini_api_key: None,
            elevenlabs_api_key: None,
            elevenlabs_voice_id: None,
            elevenlabs_model_id: "eleven_multilingual_v2".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            target_language: "vi".to_string(),
            use_ai_segmentation: false,
            segment: SegmentConfig::default(),
            repair: RepairConfig::default(),
            gap_merge: GapMergeConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

/// Pipeline stages that need provider credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcribe,
    Translate,
    Synthesize,
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    RedubError::Config(format!("{}: {e}", config_path.display()))
                })?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("ASSEMBLYAI_API_KEY") {
            self.assemblyai_api_key = Some(key);
        }
        if let Ok(key) =
            std::env::var("GEMINI_API_KEY").or_else(|_| std::env::var("GOOGLE_GEMINI_API_KEY"))
        {
            self.gemini_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
            self.elevenlabs_api_key = Some(key);
        }
        if let Ok(voice) = std::env::var("ELEVENLABS_VOICE_ID") {
            self.elevenlabs_voice_id = Some(voice);
        }
        if let Ok(model) = std::env::var("ELEVENLABS_MODEL_ID") {
            self.elevenlabs_model_id = model;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            self.gemini_model = model;
        }
        if let Ok(lang) = std::env::var("REDUB_TARGET_LANGUAGE") {
            self.target_language = lang;
        }
        if let Ok(flag) = std::env::var("REDUB_AI_SEGMENTATION") {
            if let Ok(b) = flag.parse() {
                self.use_ai_segmentation = b;
            }
        }
    }

    /// Check that the credentials for `stage` are present and the tuning
    /// values are usable.
    pub fn validate(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Transcribe => {
                if self.assemblyai_api_key.is_none() {
                    return Err(RedubError::Config(
                        "ASSEMBLYAI_API_KEY not set. Get one at https://www.assemblyai.com/dashboard"
                            .to_string(),
                    ));
                }
            }
            Stage::Translate => {
                if self.gemini_api_key.is_none() {
                    return Err(RedubError::Config(
                        "GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey"
                            .to_string(),
                    ));
                }
            }
            Stage::Synthesize => {
                if self.elevenlabs_api_key.is_none() {
                    return Err(RedubError::Config(
                        "ELEVENLABS_API_KEY not set. Export it with: export ELEVENLABS_API_KEY=..."
                            .to_string(),
                    ));
                }
                if self.elevenlabs_voice_id.is_none() {
                    return Err(RedubError::Config(
                        "ELEVENLABS_VOICE_ID not set".to_string(),
                    ));
                }
            }
        }

        if self.synthesis.sample_rate == 0 {
            return Err(RedubError::Config(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        if self.segment.min_sentence_words > self.segment.max_sentence_words {
            return Err(RedubError::Config(format!(
                "min_sentence_words ({}) exceeds max_sentence_words ({})",
                self.segment.min_sentence_words, self.segment.max_sentence_words
            )));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("redub").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.segment.min_sentence_words, 20);
        assert_eq!(config.segment.max_sentence_words, 150);
        assert_eq!(config.segment.utterance_pause(), Duration::from_millis(1500));
        assert_eq!(config.segment.max_span_duration(), Duration::from_secs(15));
        assert_eq!(config.repair.min_duration(), Duration::from_millis(500));
        assert_eq!(config.repair.overlap_gap(), Duration::from_millis(100));
        assert_eq!(config.synthesis.trailing_pad(), Duration::from_secs(1));
        assert!(!config.use_ai_segmentation);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            gemini_model = "gemini-1.5-pro"

            [segment]
            min_sentence_words = 12

            [repair]
            overlap_gap_ms = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.segment.min_sentence_words, 12);
        assert_eq!(config.segment.max_sentence_words, 150);
        assert_eq!(config.repair.overlap_gap_ms, 50);
        assert_eq!(config.repair.min_duration_ms, 500);
        assert_eq!(config.elevenlabs_model_id, "eleven_multilingual_v2");
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(config.validate(Stage::Transcribe).is_err());
        assert!(config.validate(Stage::Translate).is_err());
        assert!(config.validate(Stage::Synthesize).is_err());
    }

    #[test]
    fn test_validate_with_api_key() {
        let mut config = Config::default();
        config.gemini_api_key = Some("test-key".to_string());
        assert!(config.validate(Stage::Translate).is_ok());

        config.elevenlabs_api_key = Some("test-key".to_string());
        assert!(config.validate(Stage::Synthesize).is_err());
        config.elevenlabs_voice_id = Some("voice".to_string());
        assert!(config.validate(Stage::Synthesize).is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_word_limits() {
        let mut config = Config::default();
        config.gemini_api_key = Some("test-key".to_string());
        config.segment.min_sentence_words = 200;
        assert!(config.validate(Stage::Translate).is_err());
    }
}
