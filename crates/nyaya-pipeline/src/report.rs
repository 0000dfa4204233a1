//! Result and status views returned to callers of the pipeline.

use serde::Serialize;

use nyaya_core::fusion::FusedData;
use nyaya_core::{AnalysisStatus, CaseRecord, JudicialAnalysis, LegalSuggestion, SummaryRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub status: AnalysisStatus,
    pub confidence: f64,
    pub summary: String,
}

impl StageReport {
    pub fn completed(confidence: f64, summary: String) -> Self {
        Self {
            status: AnalysisStatus::Completed,
            confidence,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReports {
    pub evidence_checking: StageReport,
    pub summarization: StageReport,
    pub legal_action: StageReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceScores {
    pub evidence: Option<f64>,
    pub summary: Option<f64>,
    pub legal_actions: Option<f64>,
}

impl ConfidenceScores {
    pub fn of(record: &CaseRecord) -> Self {
        Self {
            evidence: record.evidence_confidence,
            summary: record.summary_confidence,
            legal_actions: record.legal_confidence,
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub case_id: String,
    pub status: AnalysisStatus,
    pub stages: StageReports,
    pub evidence: FusedData,
    pub summary: SummaryRecord,
    pub judicial_analysis: JudicialAnalysis,
    pub legal_suggestions: Vec<LegalSuggestion>,
    pub applicable_laws_display: Vec<String>,
    pub judicial_confidence: u32,
    pub confidence_scores: ConfidenceScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagesCompleted {
    pub evidence_checking: bool,
    pub summarization: bool,
    pub legal_action_analysis: bool,
}

/// Progress of a case's analysis as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub case_id: String,
    pub analysis_status: AnalysisStatus,
    pub stages_completed: StagesCompleted,
    pub confidence_scores: ConfidenceScores,
    pub timestamp: Option<String>,
    /// Only set while the case is `failed`.
    pub error: Option<String>,
}

impl StatusReport {
    pub fn of(record: &CaseRecord) -> Self {
        Self {
            case_id: record.case_id.clone(),
            analysis_status: record.analysis_status,
            stages_completed: StagesCompleted {
                evidence_checking: record.evidence_data.is_some(),
                summarization: record.summary_data.is_some(),
                legal_action_analysis: record.legal_suggestions.is_some(),
            },
            confidence_scores: ConfidenceScores::of(record),
            timestamp: record.analysis_timestamp.clone(),
            error: match record.analysis_status {
                AnalysisStatus::Failed => record.analysis_error.clone(),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_of_failed_case() {
        let mut record = CaseRecord::new("c1", "Sharma v. Gupta");
        record.analysis_status = AnalysisStatus::Failed;
        record.analysis_error = Some("summarization failed".into());
        record.evidence_data = Some(json!({"facts": []}));
        record.evidence_confidence = Some(0.4);

        let status = StatusReport::of(&record);
        assert_eq!(status.error.as_deref(), Some("summarization failed"));
        assert!(status.stages_completed.evidence_checking);
        assert!(!status.stages_completed.summarization);
        assert_eq!(status.confidence_scores.evidence, Some(0.4));

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["analysis_status"], "failed");
    }

    #[test]
    fn error_hidden_unless_failed() {
        let mut record = CaseRecord::new("c1", "t");
        record.analysis_status = AnalysisStatus::Processing;
        record.analysis_error = Some("stale".into());
        assert!(StatusReport::of(&record).error.is_none());
    }
}
