//! Generation backend boundary and the retry wrapper around it.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::tokens::{TokenEstimator, approx_token_count};

/// Text returned by [`safe_generate`] once every attempt has failed.
pub const GENERATION_FAILED: &str = "ERROR: Failed after retries";

/// Default number of attempts made by [`safe_generate`].
pub const DEFAULT_RETRIES: u32 = 3;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 1024,
            temperature: 0.2,
            top_p: 0.95,
            stop: Vec::new(),
        }
    }
}

impl GenerationParams {
    pub fn with_max_tokens(&self, max_new_tokens: u32) -> Self {
        Self {
            max_new_tokens,
            ..self.clone()
        }
    }
}

/// Binary evidence handed to the model for transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaInput {
    /// Media with its MIME type guessed from the file extension.
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            mime_type,
            data,
        }
    }
}

/// A remote text-generation capability.
///
/// Implementations report provider failures as `Err`; [`safe_generate`]
/// decides whether to retry.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier recorded in summary metadata.
    fn model_name(&self) -> &str;

    fn default_params(&self) -> GenerationParams {
        GenerationParams::default()
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;

    /// Token count for `text`. Implementations with a native counter should
    /// fall back to [`approx_token_count`] when it fails.
    async fn count_tokens(&self, text: &str) -> usize {
        approx_token_count(text)
    }

    fn truncate_to_token_limit(&self, text: &str, max_tokens: usize) -> String {
        TokenEstimator::approximate().truncate(text, max_tokens)
    }

    /// Text content of an image, audio, or video file.
    async fn transcribe(&self, _media: &MediaInput, _instruction: &str) -> Result<String, LlmError> {
        Err(LlmError::Unsupported("media transcription"))
    }
}

/// Generate with exponential backoff.
///
/// Attempt `i` (from 0) that fails is followed by a `2^i` second sleep. After
/// `retries` failed attempts the [`GENERATION_FAILED`] sentinel is returned
/// instead of an error.
pub async fn safe_generate(
    generator: &dyn Generator,
    prompt: &str,
    max_length: u32,
    retries: u32,
) -> String {
    let params = generator.default_params().with_max_tokens(max_length);
    for attempt in 0..retries {
        match generator.generate(prompt, &params).await {
            Ok(text) => return text,
            Err(e) => {
                let backoff = Duration::from_secs(1u64 << attempt.min(16));
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    retries,
                    backoff_secs = backoff.as_secs(),
                    "generation failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
    info!(retries, "generation retries exhausted");
    GENERATION_FAILED.to_string()
}

/// Whether `text` is the [`safe_generate`] failure sentinel.
pub fn is_generation_failure(text: &str) -> bool {
    text.trim() == GENERATION_FAILED
}
