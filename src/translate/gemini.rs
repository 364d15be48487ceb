//! Subtitle translation and re-segmentation with the Gemini generative API.

use crate::error::{api_error, with_retry, RedubError, Result};
use crate::translate::Translator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gemini API base URL.
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Translator using Google Gemini API.
pub struct GeminiTranslator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTranslator {
    /// Create a new Gemini translator with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: "gemini-2.0-flash".to_string(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    /// Set a different model (e.g., "gemini-1.5-pro").
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_translation_prompt(&self, srt: &str, target_lang: &str) -> String {
        let lang_name = language_name(target_lang);
        format!(
            r#"You are a professional subtitle translator. Translate the following SRT file to {lang_name}.

Rules:
1. Return ONLY {lang_name} text. Never leave lines in the source language.
2. Keep the meaning of the original.
3. Use the same number of syllables as the original or fewer, so the dub fits the timing.
4. Keep the original punctuation (. ! ? , ; :). Do not add a final period the original lacks.
5. Keep the SRT format exactly: same numbering, same timing lines.

Return only the translated SRT, with no explanations.

SRT:
{srt}"#
        )
    }

    fn build_resegment_prompt(&self, srt: &str) -> String {
        format!(
            r#"You are a subtitle editor. Merge the following SRT segments into complete, coherent sentences.

Rules:
1. Merge consecutive segments until the sentence is complete.
2. Keep existing punctuation. Do not add new periods.
3. Only merge while the sentence has not ended with . ! or ?
4. A merged entry starts at the first segment's start and ends at the last segment's end.
5. If a sentence would run longer than 15 seconds, split it into 2-3 shorter entries.
6. Return valid SRT only.

Example input:
1
00:00:00,320 --> 00:00:01,720
So I built this agent in two

2
00:00:02,220 --> 00:00:03,560
hours and someone actually paid

Example output:
1
00:00:00,320 --> 00:00:03,560
So I built this agent in two hours and someone actually paid

SRT:
{srt}"#
        )
    }

    /// Send one prompt, retrying transient failures.
    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature: 0.1 },
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let (url, request) = (&url, &request);

        let body = with_retry("Gemini", move || async move {
            let response = self
                .client
                .post(url)
                .header("X-goog-api-key", &self.api_key)
                .json(request)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(api_error("Gemini", response).await);
            }
            Ok(response.text().await?)
        })
        .await?;

        let reply: GenerateResponse = serde_json::from_str(&body)?;

        if let Some(error) = reply.error {
            return Err(RedubError::Api(format!("Gemini error: {}", error.message)));
        }

        let text = reply
            .into_text()
            .ok_or_else(|| RedubError::Translation("Gemini returned no content".to_string()))?;

        debug!("Gemini replied with {} chars", text.len());
        Ok(text.trim().to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

impl GenerateResponse {
    /// Text of the first candidate. Long replies can arrive split over
    /// several parts, which are joined back together.
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    message: String,
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate_document(&self, srt: &str, target_lang: &str) -> Result<String> {
        debug!("Translating subtitle document to {}", target_lang);
        self.generate(self.build_translation_prompt(srt, target_lang))
            .await
            .map_err(|e| match e {
                RedubError::Api(_)
                | RedubError::ServerError(_)
                | RedubError::RateLimited(_)
                | RedubError::Http(_) => e,
                other => RedubError::Translation(other.to_string()),
            })
    }

    async fn resegment_document(&self, srt: &str) -> Result<String> {
        self.generate(self.build_resegment_prompt(srt)).await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Prompt names for the languages dubbing is usually requested in.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("vi", "Vietnamese"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("pt", "Portuguese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("th", "Thai"),
    ("id", "Indonesian"),
    ("hi", "Hindi"),
];

fn language_name(code: &str) -> &'static str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or("the target language")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_translator_creation() {
        let translator = GeminiTranslator::new("test-key".to_string());
        assert_eq!(translator.name(), "gemini");
        assert_eq!(translator.model, "gemini-2.0-flash");
        assert_eq!(translator.base_url, GEMINI_API_URL);
    }

    #[test]
    fn test_with_model() {
        let translator = GeminiTranslator::new("test-key".to_string()).with_model("gemini-1.5-pro");
        assert_eq!(translator.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_translation_prompt() {
        let translator = GeminiTranslator::new("test-key".to_string());
        let srt = "1\n00:00:00,000 --> 00:00:01,000\nHello\n";
        let prompt = translator.build_translation_prompt(srt, "vi");
        assert!(prompt.contains("Vietnamese"));
        assert!(prompt.ends_with(srt));
    }

    #[test]
    fn test_resegment_prompt_mentions_limit() {
        let translator = GeminiTranslator::new("test-key".to_string());
        let prompt = translator.build_resegment_prompt("1\n00:00:00,000 --> 00:00:01,000\nHi\n");
        assert!(prompt.contains("15 seconds"));
    }

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: "hi".to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.1 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert!(json.get("generationConfig").is_some());
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("vi"), "Vietnamese");
        assert_eq!(language_name("ES"), "Spanish");
        assert_eq!(language_name("xyz"), "the target language");
    }

    #[test]
    fn test_reply_parts_joined() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "1\n"}, {"text": "00:00"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.into_text().as_deref(), Some("1\n00:00"));
    }

    #[test]
    fn test_reply_without_candidates() {
        let reply: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(reply.into_text().is_none());
    }
}
