//! Generation client, prompt building, and response repair for Nyaya.
//!
//! The [`Generator`] trait is the boundary to the remote model. Everything
//! above it (prompts, retries, parsing, the summarizer and legal-action
//! agents) is backend-independent. The Gemini REST client lives behind the
//! `http` feature; exact token counts behind `tokenizer`.

pub mod config;
pub mod entities;
mod error;
pub mod generator;
pub mod legal_action;
pub mod literal;
pub mod parse;
pub mod prompt;
pub mod statutes;
pub mod summarizer;
pub mod tokens;

#[cfg(feature = "http")]
mod gemini;

#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use config::LlmConfig;
pub use entities::extract_entities;
pub use error::{ConfigError, LlmError};
pub use generator::{
    GENERATION_FAILED, GenerationParams, Generator, MediaInput, is_generation_failure,
    safe_generate,
};
pub use legal_action::{LegalActionAgent, LegalActionError};
pub use parse::{extract_sections, parse_json};
pub use summarizer::{SummarizeError, Summarizer};
pub use tokens::TokenEstimator;

#[cfg(feature = "http")]
pub use gemini::GeminiClient;
