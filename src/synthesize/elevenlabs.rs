use crate::audio::AudioClip;
use crate::error::{api_error, with_retry, RedubError, Result};
use crate::synthesize::Synthesizer;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// ElevenLabs API base URL.
const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

/// Responses shorter than this are not real audio.
const MIN_AUDIO_BYTES: usize = 100;

/// Output rates the PCM endpoint accepts.
const SUPPORTED_SAMPLE_RATES: &[u32] = &[16_000, 22_050, 24_000, 44_100];

/// ElevenLabs text-to-speech client returning raw PCM.
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
    sample_rate: u32,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: String, voice_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            voice_id,
            model_id: "eleven_multilingual_v2".to_string(),
            sample_rate: 24_000,
            base_url: ELEVENLABS_API_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Set the PCM output rate. Unsupported rates fall back to 24 kHz.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = if SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            sample_rate
        } else {
            24_000
        };
        self
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}?output_format=pcm_{}",
            self.base_url, self.voice_id, self.sample_rate
        )
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait]
impl Synthesizer for ElevenLabsClient {
    async fn render(&self, text: &str) -> Result<AudioClip> {
        let request = TtsRequest {
            text,
            model_id: &self.model_id,
        };
        let url = self.endpoint();
        let (url, request) = (&url, &request);

        let bytes = with_retry("ElevenLabs", move || async move {
            let response = self
                .client
                .post(url)
                .header("xi-api-key", &self.api_key)
                .json(request)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(api_error("ElevenLabs", response).await);
            }
            Ok(response.bytes().await?)
        })
        .await?;

        if bytes.len() < MIN_AUDIO_BYTES {
            return Err(RedubError::Synthesis(format!(
                "ElevenLabs returned {} bytes, not valid audio",
                bytes.len()
            )));
        }

        let clip = AudioClip::from_pcm16_le(&bytes, self.sample_rate);
        debug!(
            "ElevenLabs rendered {} chars into {:.2}s",
            text.chars().count(),
            clip.duration().as_secs_f64()
        );
        Ok(clip)
    }

    fn name(&self) -> &'static str {
        "ElevenLabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let client = ElevenLabsClient::new("key".into(), "voice123".into())
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1/text-to-speech/voice123?output_format=pcm_24000"
        );
    }

    #[test]
    fn test_unsupported_sample_rate_falls_back() {
        let client = ElevenLabsClient::new("key".into(), "v".into()).with_sample_rate(48_000);
        assert_eq!(client.sample_rate, 24_000);

        let client = ElevenLabsClient::new("key".into(), "v".into()).with_sample_rate(16_000);
        assert_eq!(client.sample_rate, 16_000);
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(TtsRequest {
            text: "Xin chào",
            model_id: "eleven_multilingual_v2",
        })
        .unwrap();
        assert_eq!(body["text"], "Xin chào");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
    }
}
