//! Generation settings loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::generator::GenerationParams;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Connection and sampling settings for the Gemini backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Optional `tokenizer.json` used for local truncation and chunking.
    pub tokenizer_path: Option<PathBuf>,
}

impl LlmConfig {
    /// Config with the given key and every other setting at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        let params = GenerationParams::default();
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_new_tokens: params.max_new_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            tokenizer_path: None,
        }
    }

    /// Load from environment variables.
    ///
    /// `GEMINI_API_KEY` (or `OPENAI_API_KEY`) is required. `GEMINI_MODEL`,
    /// `GEMINI_BASE_URL`, `LLM_MAX_NEW_TOKENS`, `LLM_TEMPERATURE`, `LLM_TOP_P`
    /// and `NYAYA_TOKENIZER` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        if let Some(model) = get("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("LLM_MAX_NEW_TOKENS") {
            config.max_new_tokens = parse_var("LLM_MAX_NEW_TOKENS", &v)?;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            config.temperature = parse_var("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("LLM_TOP_P") {
            config.top_p = parse_var("LLM_TOP_P", &v)?;
        }
        config.tokenizer_path = get("NYAYA_TOKENIZER").map(PathBuf::from);
        Ok(config)
    }

    /// Default sampling parameters for calls made with this config.
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: Vec::new(),
        }
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
