use crate::error::{api_error, with_retry, RedubError, Result};
use crate::transcribe::{Transcriber, Transcript, TranscriptDocument};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// AssemblyAI API base URL.
const ASSEMBLYAI_API_URL: &str = "https://api.assemblyai.com";

/// Caption length requested for the subtitle fallback.
const CHARS_PER_CAPTION: u32 = 200;

/// AssemblyAI speech-to-text client.
///
/// Uploads the media, starts a transcript job and polls until it settles.
pub struct AssemblyAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    language_code: Option<String>,
    speaker_labels: bool,
    poll_interval: Duration,
    timeout: Duration,
    show_progress: bool,
}

impl AssemblyAiClient {
    /// Create a new AssemblyAI client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: ASSEMBLYAI_API_URL.to_string(),
            language_code: None,
            speaker_labels: true,
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(3600),
            show_progress: false,
        }
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the spoken language. Without it the provider auto-detects.
    pub fn with_language(mut self, language_code: String) -> Self {
        self.language_code = Some(language_code);
        self
    }

    /// Request speaker-labelled utterances (on by default).
    pub fn with_speaker_labels(mut self, enabled: bool) -> Self {
        self.speaker_labels = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Upload local media, returning the provider-side URL.
    async fn upload(&self, media: &Path) -> Result<String> {
        let bytes = tokio::fs::read(media).await?;
        info!(
            "Uploading {} ({:.1} MB) to AssemblyAI",
            media.display(),
            bytes.len() as f64 / (1024.0 * 1024.0)
        );

        let response = with_retry("AssemblyAI upload", || {
            send_checked(
                self.client
                    .post(format!("{}/v2/upload", self.base_url))
                    .header("authorization", &self.api_key)
                    .header("Content-Type", "application/octet-stream")
                    .body(bytes.clone()),
            )
        })
        .await?;

        let upload: UploadResponse = response.json().await?;
        debug!("Upload URL: {}", upload.upload_url);
        Ok(upload.upload_url)
    }

    /// Start a transcript job, returning its id.
    async fn request_transcript(&self, audio_url: &str) -> Result<String> {
        let request = TranscriptRequest {
            audio_url,
            punctuate: true,
            format_text: true,
            speaker_labels: self.speaker_labels.then_some(true),
            language_code: self.language_code.as_deref(),
        };

        let response = with_retry("AssemblyAI transcript request", || {
            send_checked(
                self.client
                    .post(format!("{}/v2/transcript", self.base_url))
                    .header("authorization", &self.api_key)
                    .json(&request),
            )
        })
        .await?;

        let job: TranscriptStatus = response.json().await?;
        let id = job
            .id
            .ok_or_else(|| RedubError::Transcription("No transcript id in response".to_string()))?;
        debug!("Transcript requested: {}", id);
        Ok(id)
    }

    /// Poll until the job completes, returning the finished document.
    async fn poll_until_complete(&self, id: &str) -> Result<TranscriptDocument> {
        let started = Instant::now();
        let progress = self.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let result = loop {
            match self.fetch_status(id).await {
                Ok(status) => match status.status.as_str() {
                    "completed" => break Ok(status.document),
                    "error" => {
                        break Err(RedubError::Transcription(
                            status
                                .error
                                .unwrap_or_else(|| "Unknown error".to_string()),
                        ))
                    }
                    other => {
                        debug!("Transcript {} status: {}", id, other);
                        if let Some(ref pb) = progress {
                            pb.set_message(format!("Transcribing ({})", other));
                        }
                    }
                },
                Err(e) if e.is_retryable() => warn!("Poll of transcript {} failed: {}", id, e),
                Err(e) => break Err(e),
            }

            if started.elapsed() > self.timeout {
                break Err(RedubError::Transcription(format!(
                    "Timed out after {}s waiting for transcript {}",
                    self.timeout.as_secs(),
                    id
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        };

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        if result.is_ok() {
            info!(
                "AssemblyAI transcription completed in {:.1}s",
                started.elapsed().as_secs_f64()
            );
        }

        result
    }

    async fn fetch_status(&self, id: &str) -> Result<TranscriptStatus> {
        let response = send_checked(
            self.client
                .get(format!("{}/v2/transcript/{}", self.base_url, id))
                .header("authorization", &self.api_key),
        )
        .await?;

        Ok(response.json().await?)
    }

    /// Fetch the provider's own subtitle rendering of a finished job.
    async fn download_srt(&self, id: &str) -> Result<String> {
        let response = with_retry("AssemblyAI subtitle download", || {
            send_checked(
                self.client
                    .get(format!(
                        "{}/v2/transcript/{}/srt?chars_per_caption={}",
                        self.base_url, id, CHARS_PER_CAPTION
                    ))
                    .header("authorization", &self.api_key),
            )
        })
        .await?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, media: &Path) -> Result<Transcript> {
        if !media.exists() {
            return Err(RedubError::FileNotFound(media.display().to_string()));
        }

        let upload_url = self.upload(media).await?;
        let id = self.request_transcript(&upload_url).await?;
        let document = self.poll_until_complete(&id).await?;

        if !document.utterances.is_empty() || !document.words.is_empty() {
            debug!(
                "Transcript {} has {} words, {} utterances",
                id,
                document.words.len(),
                document.utterances.len()
            );
            return Ok(Transcript::Structured(document));
        }

        warn!("Transcript {} has no word timings, falling back to subtitles", id);
        Ok(Transcript::Srt(self.download_srt(&id).await?))
    }

    fn name(&self) -> &'static str {
        "AssemblyAI"
    }
}

/// Send a request and map error statuses onto [`RedubError`].
async fn send_checked(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await?;
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error("AssemblyAI", response).await)
    }
}

// API request/response types

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    punctuate: bool,
    format_text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker_labels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptStatus {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    document: TranscriptDocument,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = TranscriptRequest {
            audio_url: "https://cdn.example/abc",
            punctuate: true,
            format_text: true,
            speaker_labels: None,
            language_code: Some("en"),
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["audio_url"], "https://cdn.example/abc");
        assert_eq!(json["language_code"], "en");
        assert!(json.get("speaker_labels").is_none());
    }

    #[test]
    fn test_status_carries_document() {
        let json = r#"{
            "id": "t1",
            "status": "completed",
            "text": "Hi.",
            "words": [{"text": "Hi.", "start": 0, "end": 300}],
            "utterances": [{"text": "Hi.", "start": 0, "end": 300, "speaker": "A"}]
        }"#;

        let status: TranscriptStatus = serde_json::from_str(json).unwrap();

        assert_eq!(status.status, "completed");
        assert_eq!(status.document.utterances[0].speaker.as_deref(), Some("A"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = AssemblyAiClient::new("key".into()).with_base_url("http://localhost:1234/");
        assert_eq!(client.base_url, "http://localhost:1234");
    }
}
