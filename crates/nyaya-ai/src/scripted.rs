//! A scripted [`Generator`] for tests.
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt.
//! Prompts with no matching rule get the fallback reply (`{}` by default).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::generator::{GenerationParams, Generator, MediaInput};

#[derive(Debug)]
struct Rule {
    needle: String,
    failures_left: Option<usize>,
    reply: Option<String>,
}

/// In-memory generator that replays canned responses and records calls.
#[derive(Debug)]
pub struct ScriptedGenerator {
    rules: Mutex<Vec<Rule>>,
    fallback: String,
    transcript: Option<String>,
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: "{}".to_string(),
            transcript: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer prompts containing `needle` with `text`.
    pub fn reply(self, needle: &str, text: &str) -> Self {
        self.push(Rule {
            needle: needle.to_string(),
            failures_left: Some(0),
            reply: Some(text.to_string()),
        })
    }

    /// Fail every call whose prompt contains `needle`.
    pub fn fail(self, needle: &str) -> Self {
        self.push(Rule {
            needle: needle.to_string(),
            failures_left: None,
            reply: None,
        })
    }

    /// Fail the first `failures` matching calls, then answer with `text`.
    pub fn flaky(self, needle: &str, failures: usize, text: &str) -> Self {
        self.push(Rule {
            needle: needle.to_string(),
            failures_left: Some(failures),
            reply: Some(text.to_string()),
        })
    }

    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = text.to_string();
        self
    }

    /// Answer every transcription request with `text`.
    pub fn with_transcript(mut self, text: &str) -> Self {
        self.transcript = Some(text.to_string());
        self
    }

    fn push(self, rule: Rule) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(rule);
        self
    }

    /// Every prompt received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Number of prompts received that contain `needle`.
    pub fn call_count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|p| p.contains(needle)).count()
    }

    pub fn last_params(&self) -> Option<GenerationParams> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.to_string(), params.clone()));

        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        let Some(rule) = rules.iter_mut().find(|r| prompt.contains(&r.needle)) else {
            return Ok(self.fallback.clone());
        };
        match rule.failures_left.as_mut() {
            None => Err(LlmError::Other(format!("scripted failure for {:?}", rule.needle))),
            Some(n) if *n > 0 => {
                *n -= 1;
                Err(LlmError::Other(format!("scripted failure for {:?}", rule.needle)))
            }
            Some(_) => Ok(rule.reply.clone().unwrap_or_default()),
        }
    }

    async fn transcribe(&self, _media: &MediaInput, _instruction: &str) -> Result<String, LlmError> {
        self.transcript
            .clone()
            .ok_or(LlmError::Unsupported("media transcription"))
    }
}
