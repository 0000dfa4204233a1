use nyaya_core::AnalysisStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case not found: {0}")]
    NotFound(String),

    #[error("case already exists: {0}")]
    AlreadyExists(String),

    #[error("analysis already in progress for case {0}")]
    AlreadyProcessing(String),

    #[error("cannot move case {case_id} from {from} to {to}")]
    InvalidTransition {
        case_id: String,
        from: AnalysisStatus,
        to: AnalysisStatus,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),
}
