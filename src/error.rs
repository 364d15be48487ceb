use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum attempts for a single external call.
pub const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
pub const BASE_DELAY_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum RedubError {
    #[error("API error: {0}")]
    Api(String),

    /// The provider answered with a 5xx status.
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Malformed subtitle data: {0}")]
    Parse(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl RedubError {
    /// Whether retrying the same external call may succeed.
    ///
    /// Transport failures, rate limits and server-side (5xx) API errors are
    /// retryable. Everything else is a local data defect or a permanent
    /// provider rejection.
    pub fn is_retryable(&self) -> bool {
        match self {
            RedubError::Http(_) | RedubError::RateLimited(_) | RedubError::ServerError(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RedubError>;

/// Turn a non-success HTTP response into an error.
///
/// 429 becomes `RateLimited` and 5xx becomes `ServerError`; anything else is
/// a permanent `Api` rejection. Both carry
/// `"{provider} API error ({status}): {body}"`.
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> RedubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return RedubError::RateLimited(provider.to_string());
    }

    let message = format!("{} API error ({}): {}", provider, status, body);
    if status.is_server_error() {
        RedubError::ServerError(message)
    } else {
        RedubError::Api(message)
    }
}

/// Run `op` up to [`MAX_RETRIES`] times with exponential backoff, giving up
/// early on errors that are not retryable.
pub(crate) async fn with_retry<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
            debug!("{}: retry attempt {} after {}ms delay", label, attempt, delay);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!("{}: attempt {} failed: {}", label, attempt + 1, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| RedubError::Api(format!("{}: unknown error", label))))
}
