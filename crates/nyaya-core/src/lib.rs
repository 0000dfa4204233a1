//! Core case-analysis types for Nyaya: evidence inputs, fused evidence,
//! summaries, judicial analyses, case records, and confidence scoring.

pub mod case;
pub mod confidence;
pub mod evidence;
pub mod fusion;
pub mod judicial;
pub mod summary;

pub use case::{AnalysisStatus, CaseRecord};
pub use confidence::{calculate_action_confidence, calculate_summary_confidence};
pub use evidence::{
    EntitySet, EvidenceBundle, EvidenceFiles, ExtractedText, ExtractionError, FileMetadata,
    Modality, TimelineEvent,
};
pub use fusion::{FusedEvidence, fuse_evidence};
pub use judicial::{JudicialAnalysis, LegalSuggestion};
pub use summary::{SummaryOutput, SummaryRecord};
