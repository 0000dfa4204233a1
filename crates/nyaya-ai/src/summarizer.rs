//! Summarizer stage: fused evidence in, structured summary out.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use nyaya_core::confidence::normalize_confidence;
use nyaya_core::evidence::value_as_text;
use nyaya_core::fusion::FusedEvidence;
use nyaya_core::summary::{SummaryMetadata, SummaryOutput, SummaryRecord};

use crate::error::LlmError;
use crate::generator::{DEFAULT_RETRIES, Generator, is_generation_failure, safe_generate};
use crate::parse::{JsonObject, extract_sections, parse_json};
use crate::prompt::{build_summarizer_prompt, chunk_summary_prompt};
use crate::tokens::{TokenEstimator, truncate_chars};

/// Evidence longer than this many tokens is summarized chunk by chunk.
pub const CHUNKING_THRESHOLD: usize = 3000;
pub const CHUNK_TOKENS: usize = 1200;
pub const CHUNK_MAX_TOKENS: u32 = 400;
pub const SUMMARY_MAX_TOKENS: u32 = 1500;

const PARTIAL_CONFIDENCE: f64 = 0.3;
const PARTIAL_PREVIEW_CHARS: usize = 200;
const MIN_RESPONSE_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summary generation failed after retries")]
    GenerationFailed,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[derive(Debug)]
pub struct Summarizer {
    /// Pause after every remote call.
    pub throttle: Duration,
    pub retries: u32,
    pub estimator: TokenEstimator,
}

impl Default for Summarizer {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(2),
            retries: DEFAULT_RETRIES,
            estimator: TokenEstimator::approximate(),
        }
    }
}

impl Summarizer {
    pub fn new(throttle: Duration, retries: u32) -> Self {
        Self {
            throttle,
            retries,
            ..Self::default()
        }
    }

    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub async fn summarize(
        &self,
        generator: &dyn Generator,
        fused: &FusedEvidence,
    ) -> Result<SummaryOutput, SummarizeError> {
        let text = &fused.fused_data.combined_text;
        let input_tokens = self.estimator.count(text);

        let record = if input_tokens > CHUNKING_THRESHOLD {
            info!(
                case_id = %fused.case_id,
                input_tokens, "long evidence, summarizing in chunks"
            );
            self.summarize_chunks(generator, text).await
        } else {
            self.summarize_whole(generator, fused).await?
        };

        info!(
            case_id = %fused.case_id,
            confidence = record.confidence_score,
            issues = record.legal_issues.len(),
            "summary generated"
        );

        Ok(SummaryOutput {
            case_id: fused.case_id.clone(),
            summary: record,
            metadata: SummaryMetadata {
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                model: generator.model_name().to_string(),
                evidence_sources: fused.source_files.len(),
                entities_processed: fused.data_quality.entities_extracted,
            },
        })
    }

    /// Summarize each chunk, then join the texts and average the confidences.
    async fn summarize_chunks(&self, generator: &dyn Generator, text: &str) -> SummaryRecord {
        let chunks = self.estimator.chunk(text, CHUNK_TOKENS);
        let mut texts = Vec::with_capacity(chunks.len());
        let mut confidence_total = 0.0;

        for (i, chunk) in chunks.iter().enumerate() {
            let response = safe_generate(
                generator,
                &chunk_summary_prompt(chunk),
                CHUNK_MAX_TOKENS,
                self.retries,
            )
            .await;
            tokio::time::sleep(self.throttle).await;

            let (summary_text, confidence) = match chunk_summary(&response) {
                Some(parsed) => parsed,
                None => {
                    warn!(chunk = i, "chunk summary unusable, keeping partial text");
                    (
                        format!(
                            "Partial summary: {}...",
                            truncate_chars(chunk, PARTIAL_PREVIEW_CHARS)
                        ),
                        PARTIAL_CONFIDENCE,
                    )
                }
            };
            texts.push(summary_text);
            confidence_total += confidence;
        }

        SummaryRecord {
            summary: texts.join("\n"),
            confidence_score: confidence_total / chunks.len().max(1) as f64,
            ..SummaryRecord::default()
        }
    }

    async fn summarize_whole(
        &self,
        generator: &dyn Generator,
        fused: &FusedEvidence,
    ) -> Result<SummaryRecord, SummarizeError> {
        let prompt = build_summarizer_prompt(generator, &fused.fused_data).await?;
        let response = safe_generate(generator, &prompt, SUMMARY_MAX_TOKENS, self.retries).await;
        tokio::time::sleep(self.throttle).await;

        if is_generation_failure(&response) {
            return Err(SummarizeError::GenerationFailed);
        }
        Ok(parse_summary_response(&response, fused).score())
    }
}

/// Read a summary record out of a model response.
///
/// JSON with at least one non-empty value wins, then header sections, then
/// the structure built from the fused evidence alone.
pub fn parse_summary_response(response: &str, fused: &FusedEvidence) -> SummaryRecord {
    if response.trim().chars().count() < MIN_RESPONSE_CHARS {
        return SummaryRecord::fallback(fused);
    }

    let parsed = parse_json(response);
    if parsed.values().any(is_truthy) {
        return SummaryRecord::from_parsed(&parsed);
    }

    let sections = extract_sections(response);
    if !sections.is_empty() {
        return SummaryRecord {
            facts: sections
                .facts
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            legal_issues: sections.legal_issues,
            summary: sections.summary,
            ..SummaryRecord::default()
        };
    }

    warn!("summary response had no usable structure, using fallback");
    SummaryRecord::fallback(fused)
}

fn chunk_summary(response: &str) -> Option<(String, f64)> {
    if is_generation_failure(response) {
        return None;
    }
    let parsed: JsonObject = parse_json(response);
    if parsed.is_empty() {
        return None;
    }
    let text = parsed
        .get("summary_text")
        .and_then(value_as_text)
        .unwrap_or_default();
    let confidence = parsed
        .get("confidence_score")
        .and_then(Value::as_f64)
        .map_or(0.0, normalize_confidence);
    Some((text, confidence))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedGenerator;
    use nyaya_core::evidence::{EntitySet, EvidenceBundle, Modality};
    use nyaya_core::fusion::fuse_evidence;
    use tokio::time::Instant;

    const MAIN: &str = "You are an expert Indian legal summarizer";
    const CHUNK: &str = "Summarize the following legal evidence chunk";

    fn fused(text: &str) -> FusedEvidence {
        let mut bundle = EvidenceBundle::new();
        bundle.push(Modality::Document, Ok(text.to_string()));
        let entities = EntitySet {
            legal_references: vec!["ICA 73".into(), "IPC 420".into()],
            ..Default::default()
        };
        fuse_evidence("case-7", &bundle, &[], &entities)
    }

    fn quick() -> Summarizer {
        Summarizer::new(Duration::ZERO, 1)
    }

    #[tokio::test]
    async fn json_reply_is_scored() {
        let reply = r#"```json
{"facts": ["Buyer paid Rs 50,000", "Seller never delivered"],
 "legal_issues": ["Breach of contract"],
 "summary": "A dispute over undelivered goods.",
 "confidence_score": 0.9}
```"#;
        let g = ScriptedGenerator::new().reply(MAIN, reply);
        let out = quick()
            .summarize(&g, &fused("The buyer paid for goods that were never delivered."))
            .await
            .unwrap();
        assert_eq!(out.case_id, "case-7");
        assert_eq!(out.summary.facts.len(), 2);
        // 5 words, 1 issue, 2 facts.
        let expected = 0.05 * 0.4 + (1.0 / 3.0) * 0.3 + 0.4 * 0.3;
        assert!((out.summary.confidence_score - expected).abs() < 1e-9);
        assert_eq!(out.metadata.model, "scripted");
        assert_eq!(g.last_params().map(|p| p.max_new_tokens), Some(1500));
    }

    #[tokio::test]
    async fn section_reply_splits_fact_lines() {
        let reply = "FACTS:\nGoods were ordered.\nPayment was made.\n\
                     LEGAL ISSUES:\nBreach of contract\n\
                     SUMMARY: Seller failed to deliver.";
        let g = ScriptedGenerator::new().reply(MAIN, reply);
        let out = quick().summarize(&g, &fused("short evidence")).await.unwrap();
        assert_eq!(out.summary.facts, vec!["Goods were ordered.", "Payment was made."]);
        assert_eq!(out.summary.legal_issues, vec!["Breach of contract"]);
        assert_eq!(out.summary.summary, "Seller failed to deliver.");
        assert!(out.summary.key_points.is_empty());
    }

    #[tokio::test]
    async fn short_reply_falls_back() {
        let g = ScriptedGenerator::new().reply(MAIN, " ok ");
        let out = quick()
            .summarize(&g, &fused("The agreement for sale was signed in March of that year."))
            .await
            .unwrap();
        assert_eq!(out.summary.summary, nyaya_core::summary::FALLBACK_SUMMARY);
        assert_eq!(out.summary.legal_issues, vec!["ICA 73", "IPC 420"]);
        assert_eq!(out.summary.facts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_main_call_is_an_error() {
        let g = ScriptedGenerator::new().fail(MAIN);
        let err = Summarizer::new(Duration::ZERO, 2)
            .summarize(&g, &fused("evidence"))
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::GenerationFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn long_evidence_is_chunked_and_averaged() {
        // With its label the combined text is 12_013 chars, over 3000 tokens.
        let text = "x".repeat(12_000);
        let g = ScriptedGenerator::new()
            .flaky(CHUNK, 1, r#"{"summary_text": "chunk ok", "confidence_score": 0.9}"#);
        let summarizer = Summarizer::new(Duration::from_secs(2), 1);
        let start = Instant::now();
        let out = summarizer.summarize(&g, &fused(&text)).await.unwrap();

        // 4800-char chunks give three calls; the first fails once.
        assert_eq!(g.call_count(CHUNK), 3);
        assert_eq!(g.call_count(MAIN), 0);
        let merged = &out.summary.summary;
        assert!(merged.starts_with("Partial summary: [document_0]\nxxx"));
        assert!(merged.ends_with("x...\nchunk ok\nchunk ok"));
        let expected = (0.3 + 0.9 + 0.9) / 3.0;
        assert!((out.summary.confidence_score - expected).abs() < 1e-9);
        assert!(out.summary.facts.is_empty());
        // One 1 s backoff plus a 2 s throttle per chunk.
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 3 * 2));
        assert_eq!(g.last_params().map(|p| p.max_new_tokens), Some(400));
    }

    #[tokio::test]
    async fn chunk_confidence_in_percent_is_normalized() {
        let text = "x".repeat(12_000);
        let g = ScriptedGenerator::new()
            .reply(CHUNK, r#"{"summary_text": "ok", "confidence_score": 85}"#);
        let out = quick().summarize(&g, &fused(&text)).await.unwrap();
        assert_eq!(g.call_count(CHUNK), 3);
        assert!((out.summary.confidence_score - 0.85).abs() < 1e-9);

        let g = ScriptedGenerator::new()
            .reply(CHUNK, r#"{"summary_text": "ok", "confidence_score": 400}"#);
        let out = quick().summarize(&g, &fused(&text)).await.unwrap();
        assert_eq!(out.summary.confidence_score, 1.0);
    }

    #[test]
    fn truthiness_of_parsed_values() {
        let f = fused("evidence text that is long enough to be a fact.");
        let rec = parse_summary_response(r#"{"summary": "", "facts": []} trailing"#, &f);
        assert_eq!(rec.summary, nyaya_core::summary::FALLBACK_SUMMARY);
    }
}
