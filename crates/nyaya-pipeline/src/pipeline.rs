//! Three-stage case analysis: evidence, summary, legal action.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use nyaya_ai::entities::ENTITY_MAX_TOKENS;
use nyaya_ai::generator::DEFAULT_RETRIES;
use nyaya_ai::{Generator, LegalActionAgent, LegalActionError, SummarizeError, Summarizer, TokenEstimator};
use nyaya_core::{AnalysisStatus, CaseRecord, EvidenceFiles};
use nyaya_store::{CaseStore, StoreError};

use crate::evidence::EvidenceChecker;
use crate::report::{AnalysisReport, ConfidenceScores, StageReport, StageReports};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("legal analysis failed: {0}")]
    LegalAction(#[from] LegalActionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause after each remote call that is throttled.
    pub throttle: Duration,
    pub retries: u32,
    pub entity_max_tokens: u32,
    pub assess_relevance: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_secs(2),
            retries: DEFAULT_RETRIES,
            entity_max_tokens: ENTITY_MAX_TOKENS,
            assess_relevance: false,
        }
    }
}

/// Result of [`Pipeline::analyze`].
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// A completed analysis already existed and was not forced to re-run.
    Cached(CaseRecord),
    Completed(Box<AnalysisReport>),
}

pub struct Pipeline {
    store: Arc<dyn CaseStore>,
    generator: Arc<dyn Generator>,
    checker: EvidenceChecker,
    summarizer: Summarizer,
    legal: LegalActionAgent,
}

impl Pipeline {
    pub fn new(store: Arc<dyn CaseStore>, generator: Arc<dyn Generator>, config: PipelineConfig) -> Self {
        Self {
            store,
            generator,
            checker: EvidenceChecker {
                retries: config.retries,
                throttle: config.throttle,
                entity_max_tokens: config.entity_max_tokens,
                assess_relevance: config.assess_relevance,
            },
            summarizer: Summarizer::new(config.throttle, config.retries),
            legal: LegalActionAgent::new(config.retries),
        }
    }

    /// Use `estimator` for the summarizer's chunking decisions.
    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.summarizer = self.summarizer.with_estimator(estimator);
        self
    }

    pub fn store(&self) -> &dyn CaseStore {
        self.store.as_ref()
    }

    /// Run the full analysis for a case.
    ///
    /// Without `files` (or with an empty set) the case's stored evidence
    /// descriptors are used. A completed case is returned as cached unless
    /// `force` is set. On a stage error, or when the completed status cannot
    /// be stored, the case is marked failed with the error message, results
    /// of earlier stages stay persisted, and the error is returned.
    pub async fn analyze(
        &self,
        case_id: &str,
        files: Option<EvidenceFiles>,
        force: bool,
    ) -> Result<AnalysisOutcome, PipelineError> {
        let record = self.store.get(case_id)?;
        if record.analysis_status == AnalysisStatus::Completed && !force {
            info!(case_id, "analysis already completed");
            return Ok(AnalysisOutcome::Cached(record));
        }

        let files = match files {
            Some(files) if !files.is_empty() => files,
            _ => {
                let stored = EvidenceFiles::from_descriptors(&record.evidence_files);
                info!(case_id, files = stored.total(), "using stored evidence files");
                stored
            }
        };
        if files.is_empty() {
            warn!(case_id, "no evidence files for analysis");
        }

        let record = self.store.mark_processing(case_id, force)?;
        let outcome = self.run_stages(&record, &files).await.and_then(|report| {
            self.store.mark_analysis_complete(case_id)?;
            Ok(report)
        });
        match outcome {
            Ok(report) => {
                info!(case_id, "full pipeline complete");
                Ok(AnalysisOutcome::Completed(Box::new(report)))
            }
            Err(e) => {
                error!(case_id, error = %e, "pipeline failed");
                if let Err(mark) = self.store.mark_analysis_failed(case_id, &e.to_string()) {
                    error!(case_id, error = %mark, "could not record failure");
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        record: &CaseRecord,
        files: &EvidenceFiles,
    ) -> Result<AnalysisReport, PipelineError> {
        let case_id = record.case_id.as_str();
        let generator = self.generator.as_ref();

        // ── Stage 1: evidence ──
        info!(case_id, "stage 1: evidence extraction and validation");
        let fused = self.checker.analyze(generator, case_id, files).await;
        let evidence_confidence = fused.data_quality.completeness_score;
        self.store.update_evidence(
            case_id,
            serde_json::to_value(&fused.fused_data)?,
            evidence_confidence,
        )?;
        info!(
            case_id,
            confidence = evidence_confidence,
            entities = fused.data_quality.entities_extracted,
            "evidence stored"
        );

        // ── Stage 2: summary ──
        info!(case_id, "stage 2: case summarization");
        let summary = self.summarizer.summarize(generator, &fused).await?;
        let summary_confidence = summary.summary.confidence_score;
        self.store
            .update_summary(case_id, serde_json::to_value(&summary)?, summary_confidence)?;
        info!(
            case_id,
            confidence = summary_confidence,
            issues = summary.summary.legal_issues.len(),
            "summary stored"
        );

        // ── Stage 3: legal action ──
        info!(case_id, "stage 3: legal action analysis");
        let analysis = self
            .legal
            .recommend(generator, &record.description(), &summary.summary.summary)
            .await?;
        let judicial_confidence = analysis.primary_confidence();
        self.store.update_legal_suggestions(
            case_id,
            analysis.clone().into_value(),
            f64::from(judicial_confidence),
        )?;

        Ok(AnalysisReport {
            case_id: case_id.to_string(),
            status: AnalysisStatus::Completed,
            stages: StageReports {
                evidence_checking: StageReport::completed(
                    evidence_confidence,
                    format!("Processed {} files", fused.source_files.len()),
                ),
                summarization: StageReport::completed(
                    summary_confidence,
                    format!("Identified {} issues", summary.summary.legal_issues.len()),
                ),
                legal_action: StageReport::completed(
                    f64::from(judicial_confidence),
                    format!(
                        "Generated judicial analysis with {} applicable laws",
                        analysis.applicable_laws().len()
                    ),
                ),
            },
            evidence: fused.fused_data,
            summary: summary.summary,
            applicable_laws_display: analysis.applicable_laws_display(),
            legal_suggestions: analysis.suggestions(),
            judicial_confidence,
            judicial_analysis: analysis,
            confidence_scores: ConfidenceScores {
                evidence: Some(evidence_confidence),
                summary: Some(summary_confidence),
                legal_actions: Some(f64::from(judicial_confidence)),
            },
        })
    }
}
