//! Evidence intake and the three-stage analysis pipeline.
//!
//! [`Pipeline::analyze`] runs evidence checking, summarization, and legal
//! action analysis for one case, persisting each stage's output through a
//! [`nyaya_store::CaseStore`] as it completes.

pub mod evidence;
pub mod intake;
mod pipeline;
pub mod report;

pub use evidence::EvidenceChecker;
pub use pipeline::{AnalysisOutcome, Pipeline, PipelineConfig, PipelineError};
pub use report::{AnalysisReport, StatusReport};
