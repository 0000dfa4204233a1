//! Case records and the analysis status state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Where a case is in the three-stage analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// `completed` and `failed` only leave via a new run (`processing`).
    pub fn can_transition_to(&self, next: AnalysisStatus) -> bool {
        use AnalysisStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Processing)
                | (Completed, Processing)
                | (Failed, Processing)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown analysis status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AnalysisStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A persisted case with its stage outputs.
///
/// Stage outputs are kept as JSON so that records written by older runs (or
/// by hand) still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// ISO 8601 date string.
    #[serde(default)]
    pub next_hearing: Option<String>,
    /// Uploaded evidence descriptors (`category`, `absolute_path`, ...).
    #[serde(default)]
    pub evidence_files: Vec<Value>,
    #[serde(default)]
    pub evidence_data: Option<Value>,
    #[serde(default)]
    pub evidence_confidence: Option<f64>,
    #[serde(default)]
    pub summary_data: Option<Value>,
    #[serde(default)]
    pub summary_confidence: Option<f64>,
    #[serde(default)]
    pub legal_suggestions: Option<Value>,
    #[serde(default)]
    pub legal_confidence: Option<f64>,
    #[serde(default)]
    pub analysis_status: AnalysisStatus,
    #[serde(default)]
    pub analysis_error: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub analysis_timestamp: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl CaseRecord {
    pub fn new(case_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// `"{title} ({category})"`, used as the case description in prompts.
    pub fn description(&self) -> String {
        match self.category.as_deref() {
            Some(c) if !c.is_empty() => format!("{} ({c})", self.title),
            _ => self.title.clone(),
        }
    }

    pub fn has_all_results(&self) -> bool {
        self.evidence_data.is_some() && self.summary_data.is_some() && self.legal_suggestions.is_some()
    }
}
