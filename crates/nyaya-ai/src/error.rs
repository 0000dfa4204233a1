use thiserror::Error;

/// Failure of a single call to the generation backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model returned no text")]
    EmptyResponse,

    #[error("{0} is not supported by this generator")]
    Unsupported(&'static str),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Invalid or missing generation settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key configured: set GEMINI_API_KEY or OPENAI_API_KEY")]
    MissingApiKey,

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}
