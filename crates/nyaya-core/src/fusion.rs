//! Evidence fusion: merges per-file extraction output into one case-level record.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence::completeness_score;
use crate::evidence::{EntitySet, EvidenceBundle, FileMetadata, TimelineEvent, dedup_sorted};

/// Maximum number of fallback facts taken from the combined text.
const MAX_FALLBACK_FACTS: usize = 20;

/// Minimum length (in characters) of a sentence fragment kept as a fact.
const MIN_FACT_CHARS: usize = 20;

/// The single merged evidence record for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedEvidence {
    pub case_id: String,
    pub fused_data: FusedData,
    pub source_files: Vec<SourceFile>,
    pub integrity_check: IntegrityCheck,
    pub data_quality: DataQuality,
    #[serde(default)]
    pub document_relevance: BTreeMap<String, DocumentRelevance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness_assessment: Option<CompletenessAssessment>,
}

/// The persisted part of fused evidence (stored as the case's evidence data).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusedData {
    pub combined_text: String,
    pub facts: Vec<String>,
    pub witness_statements: Vec<String>,
    pub legal_references: Vec<String>,
    pub timeline: Vec<TimelineEvent>,
    pub key_entities: KeyEntities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyEntities {
    /// Persons and organizations, merged and deduplicated.
    pub persons: Vec<String>,
    pub money_amounts: Vec<String>,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<u64>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub all_files_valid: bool,
    pub total_files: usize,
    /// ISO 8601 timestamp string.
    pub processing_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub text_length: usize,
    pub entities_extracted: usize,
    pub completeness_score: f64,
}

/// Model-assessed relevance of a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRelevance {
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
    pub key_information: String,
    pub relevance_category: String,
}

/// Model-assessed readiness of the evidence as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessAssessment {
    pub present_information: Vec<String>,
    pub missing_information: Vec<String>,
    /// Readiness in `[0, 1]`.
    pub case_readiness: f64,
}

/// Fuse extracted texts, file metadata, and accumulated entities into one record.
///
/// Failed extractions are left out of the combined text but every metadata
/// record still counts towards `total_files`.
pub fn fuse_evidence(
    case_id: &str,
    bundle: &EvidenceBundle,
    file_metadata: &[FileMetadata],
    entities: &EntitySet,
) -> FusedEvidence {
    let combined_text = combine_texts(bundle);
    let facts = fallback_facts(&combined_text);

    let mut persons = entities.persons.clone();
    persons.extend(entities.organizations.iter().cloned());

    let fused_data = FusedData {
        facts,
        witness_statements: entities.witness_statements.clone(),
        legal_references: entities.legal_references.clone(),
        timeline: entities.timeline_events.clone(),
        key_entities: KeyEntities {
            persons: dedup_sorted(persons),
            money_amounts: entities.money_amounts.clone(),
            dates: entities.dates.clone(),
        },
        combined_text,
    };

    let source_files = file_metadata
        .iter()
        .filter(|m| m.valid)
        .map(|m| SourceFile {
            file_name: m.file_name.clone(),
            file_type: m.file_type.clone(),
            file_size: m.file_size_bytes,
            hash: m.file_hash.clone(),
        })
        .collect();

    let data_quality = DataQuality {
        text_length: fused_data.combined_text.chars().count(),
        entities_extracted: entities.total(),
        completeness_score: completeness_score(entities),
    };

    debug!(
        case_id,
        text_length = data_quality.text_length,
        entities = data_quality.entities_extracted,
        completeness = data_quality.completeness_score,
        "fused evidence"
    );

    FusedEvidence {
        case_id: case_id.to_string(),
        fused_data,
        source_files,
        integrity_check: IntegrityCheck {
            all_files_valid: file_metadata.iter().all(|m| m.valid),
            total_files: file_metadata.len(),
            processing_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        },
        data_quality,
        document_relevance: BTreeMap::new(),
        completeness_assessment: None,
    }
}

/// `"[label]\ntext"` for each successful extraction, separated by blank lines.
pub fn combine_texts(bundle: &EvidenceBundle) -> String {
    bundle
        .successful()
        .map(|(label, text)| format!("[{label}]\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Crude sentence facts: split on `.` after flattening newlines, keep
/// fragments longer than 20 characters, at most 20 of them.
pub fn fallback_facts(text: &str) -> Vec<String> {
    text.replace('\n', " ")
        .split('.')
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_FACT_CHARS)
        .take(MAX_FALLBACK_FACTS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{ExtractionError, Modality};

    fn valid_meta(name: &str) -> FileMetadata {
        FileMetadata {
            valid: true,
            file_path: format!("/evidence/{name}"),
            error: None,
            file_name: Some(name.to_string()),
            file_type: Some("text".into()),
            file_size_bytes: Some(128),
            file_hash: Some("abc".into()),
            timestamp: Some("2024-01-01T00:00:00Z".into()),
        }
    }

    #[test]
    fn combined_text_skips_failed_extractions() {
        let mut bundle = EvidenceBundle::new();
        bundle.push(Modality::Document, Ok("The buyer paid in full.".into()));
        bundle.push(
            Modality::Audio,
            Err(ExtractionError::Unavailable("no transcriber".into())),
        );
        bundle.push(Modality::Document, Ok(String::new()));
        let text = combine_texts(&bundle);
        assert_eq!(text, "[document_0]\nThe buyer paid in full.");
    }

    #[test]
    fn facts_are_long_fragments_only() {
        let text = "Short one. The seller delivered defective goods on 5 May.\nOk. \
                    The complainant issued a legal notice thereafter.";
        let facts = fallback_facts(text);
        assert_eq!(
            facts,
            vec![
                "The seller delivered defective goods on 5 May",
                "The complainant issued a legal notice thereafter",
            ]
        );
    }

    #[test]
    fn facts_cap_at_twenty() {
        let text = (0..30)
            .map(|i| format!("This is a sufficiently long sentence number {i}"))
            .collect::<Vec<_>>()
            .join(". ");
        assert_eq!(fallback_facts(&text).len(), 20);
    }

    #[test]
    fn invalid_files_counted_but_not_listed() {
        let bundle = EvidenceBundle::new();
        let meta = vec![
            valid_meta("a.txt"),
            FileMetadata::missing(std::path::Path::new("/evidence/gone.txt")),
        ];
        let fused = fuse_evidence("C-1", &bundle, &meta, &EntitySet::default());
        assert_eq!(fused.source_files.len(), 1);
        assert_eq!(fused.integrity_check.total_files, 2);
        assert!(!fused.integrity_check.all_files_valid);
    }

    #[test]
    fn key_persons_merge_organizations() {
        let entities = EntitySet {
            persons: vec!["Ravi".into(), "Anita".into()],
            organizations: vec!["Acme Traders".into(), "Ravi".into()],
            legal_references: vec!["Section 420 IPC".into()],
            ..Default::default()
        };
        let fused = fuse_evidence("C-2", &EvidenceBundle::new(), &[], &entities);
        assert_eq!(
            fused.fused_data.key_entities.persons,
            vec!["Acme Traders", "Anita", "Ravi"]
        );
        assert_eq!(fused.data_quality.entities_extracted, 5);
        assert!((fused.data_quality.completeness_score - 0.4).abs() < 1e-9);
        assert!(fused.integrity_check.all_files_valid);
    }
}
