//! Case-record persistence: the store boundary, an in-memory store, and a
//! DuckDB-backed store behind the `duckdb` feature.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;

use chrono::{SecondsFormat, Utc};
use nyaya_core::{AnalysisStatus, CaseRecord};
use serde_json::Value;
use tracing::info;

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Persistence for case records.
///
/// Implementations apply [`update`](Self::update) atomically: the closure
/// sees the current record and no other update interleaves. Every update
/// stamps `last_updated`.
pub trait CaseStore: Send + Sync {
    fn get(&self, case_id: &str) -> Result<CaseRecord, StoreError>;

    /// Add a new case. Fails if the id is taken.
    fn insert(&self, record: CaseRecord) -> Result<(), StoreError>;

    /// All cases ordered by id.
    fn list(&self) -> Result<Vec<CaseRecord>, StoreError>;

    /// Apply `apply` to the stored record and persist the result.
    fn update(
        &self,
        case_id: &str,
        apply: &mut dyn FnMut(&mut CaseRecord) -> Result<(), StoreError>,
    ) -> Result<CaseRecord, StoreError>;

    // ── Evidence files ──

    fn add_evidence_file(&self, case_id: &str, descriptor: Value) -> Result<CaseRecord, StoreError> {
        let mut descriptor = Some(descriptor);
        self.update(case_id, &mut |record| {
            record.evidence_files.extend(descriptor.take());
            Ok(())
        })
    }

    fn set_evidence_files(&self, case_id: &str, files: Vec<Value>) -> Result<CaseRecord, StoreError> {
        let mut files = Some(files);
        self.update(case_id, &mut |record| {
            record.evidence_files = files.take().unwrap_or_default();
            Ok(())
        })
    }

    // ── Analysis lifecycle ──

    /// Enter `processing` for a new run and clear any previous error.
    ///
    /// A case already `processing` is refused unless `force` is set.
    fn mark_processing(&self, case_id: &str, force: bool) -> Result<CaseRecord, StoreError> {
        self.update(case_id, &mut |record| {
            if record.analysis_status == AnalysisStatus::Processing && !force {
                return Err(StoreError::AlreadyProcessing(record.case_id.clone()));
            }
            transition(record, AnalysisStatus::Processing)?;
            record.analysis_error = None;
            Ok(())
        })
    }

    fn update_evidence(
        &self,
        case_id: &str,
        evidence_data: Value,
        confidence: f64,
    ) -> Result<CaseRecord, StoreError> {
        let mut data = Some(evidence_data);
        self.update(case_id, &mut |record| {
            record.evidence_data = data.take();
            record.evidence_confidence = Some(confidence);
            Ok(())
        })
    }

    fn update_summary(
        &self,
        case_id: &str,
        summary_data: Value,
        confidence: f64,
    ) -> Result<CaseRecord, StoreError> {
        let mut data = Some(summary_data);
        self.update(case_id, &mut |record| {
            record.summary_data = data.take();
            record.summary_confidence = Some(confidence);
            Ok(())
        })
    }

    fn update_legal_suggestions(
        &self,
        case_id: &str,
        legal_suggestions: Value,
        confidence: f64,
    ) -> Result<CaseRecord, StoreError> {
        let mut data = Some(legal_suggestions);
        self.update(case_id, &mut |record| {
            record.legal_suggestions = data.take();
            record.legal_confidence = Some(confidence);
            Ok(())
        })
    }

    fn mark_analysis_complete(&self, case_id: &str) -> Result<CaseRecord, StoreError> {
        let record = self.update(case_id, &mut |record| {
            transition(record, AnalysisStatus::Completed)?;
            record.analysis_timestamp = Some(now_timestamp());
            Ok(())
        })?;
        info!(case_id, "analysis completed");
        Ok(record)
    }

    /// Record a failed run. Results from earlier stages are left in place.
    fn mark_analysis_failed(&self, case_id: &str, message: &str) -> Result<CaseRecord, StoreError> {
        let record = self.update(case_id, &mut |record| {
            transition(record, AnalysisStatus::Failed)?;
            record.analysis_error = Some(message.to_string());
            Ok(())
        })?;
        info!(case_id, error = message, "analysis failed");
        Ok(record)
    }
}

fn transition(record: &mut CaseRecord, to: AnalysisStatus) -> Result<(), StoreError> {
    let from = record.analysis_status;
    if !from.can_transition_to(to) {
        return Err(StoreError::InvalidTransition {
            case_id: record.case_id.clone(),
            from,
            to,
        });
    }
    record.analysis_status = to;
    Ok(())
}

/// Run `apply` against a copy of `record`, stamping `last_updated` on success.
pub(crate) fn apply_update(
    record: &CaseRecord,
    apply: &mut dyn FnMut(&mut CaseRecord) -> Result<(), StoreError>,
) -> Result<CaseRecord, StoreError> {
    let mut updated = record.clone();
    apply(&mut updated)?;
    updated.last_updated = Some(now_timestamp());
    Ok(updated)
}
