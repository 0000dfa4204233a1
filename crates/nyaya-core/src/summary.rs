//! Structured case summaries produced by the summarizer stage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::confidence::summary_record_confidence;
use crate::evidence::{coerce_strings, value_as_text};
use crate::fusion::FusedEvidence;

/// Summary text used when the model gave nothing usable.
pub const FALLBACK_SUMMARY: &str = "Case summary generated from available evidence.";

/// A structured case summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub legal_issues: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
}

impl SummaryRecord {
    /// Read the summary fields out of a parsed model response.
    ///
    /// List fields given as a single string are split into non-empty lines.
    pub fn from_parsed(parsed: &Map<String, Value>) -> Self {
        Self {
            facts: string_or_list(parsed.get("facts")),
            legal_issues: string_or_list(parsed.get("legal_issues")),
            summary: parsed
                .get("summary")
                .and_then(value_as_text)
                .unwrap_or_default(),
            key_points: string_or_list(parsed.get("key_points")),
            confidence_score: 0.0,
        }
    }

    /// Structure built from fused evidence alone: the first five facts, the
    /// first three legal references, and a generic summary line.
    pub fn fallback(fused: &FusedEvidence) -> Self {
        Self {
            facts: fused.fused_data.facts.iter().take(5).cloned().collect(),
            legal_issues: fused.fused_data.legal_references.iter().take(3).cloned().collect(),
            summary: FALLBACK_SUMMARY.to_string(),
            key_points: Vec::new(),
            confidence_score: 0.0,
        }
    }

    /// Recompute `confidence_score` from summary length, issues, and facts.
    pub fn score(mut self) -> Self {
        self.confidence_score =
            summary_record_confidence(&self.summary, self.legal_issues.len(), self.facts.len());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
            && self.legal_issues.is_empty()
            && self.summary.is_empty()
            && self.key_points.is_empty()
    }
}

/// Provenance for a generated summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetadata {
    /// ISO 8601 timestamp string.
    pub generated_at: String,
    pub model: String,
    pub evidence_sources: usize,
    pub entities_processed: usize,
}

/// What the summarizer stage persists for a case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub case_id: String,
    pub summary: SummaryRecord,
    pub metadata: SummaryMetadata,
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        other => coerce_strings(other),
    }
}
