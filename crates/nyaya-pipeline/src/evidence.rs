//! Evidence checker stage: validate, extract, extract entities, fuse.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use nyaya_ai::entities::{ENTITY_MAX_TOKENS, extract_entities};
use nyaya_ai::generator::DEFAULT_RETRIES;
use nyaya_ai::parse::parse_strict;
use nyaya_ai::prompt::{relevance_prompt, validation_prompt};
use nyaya_ai::{Generator, is_generation_failure, parse_json, safe_generate};
use nyaya_core::evidence::{
    EntitySet, EvidenceBundle, EvidenceFiles, FileMetadata, Modality, coerce_strings,
    value_as_text,
};
use nyaya_core::fusion::{CompletenessAssessment, DocumentRelevance, FusedEvidence, fuse_evidence};

use crate::intake::{extract_text, validate_file};

const DEFAULT_READINESS: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct EvidenceChecker {
    pub retries: u32,
    /// Pause after each relevance and validation call.
    pub throttle: Duration,
    pub entity_max_tokens: u32,
    /// Score every document's relevance with the model. Off by default.
    pub assess_relevance: bool,
}

impl Default for EvidenceChecker {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            throttle: Duration::from_secs(2),
            entity_max_tokens: ENTITY_MAX_TOKENS,
            assess_relevance: false,
        }
    }
}

impl EvidenceChecker {
    /// Run the whole stage for one case.
    ///
    /// Files are processed modality by modality in a fixed order. Missing
    /// files and failed extractions are recorded and skipped; the stage
    /// itself never fails.
    pub async fn analyze(
        &self,
        generator: &dyn Generator,
        case_id: &str,
        files: &EvidenceFiles,
    ) -> FusedEvidence {
        info!(case_id, files = files.total(), "analyzing evidence");

        let mut bundle = EvidenceBundle::new();
        let mut metadata: Vec<FileMetadata> = Vec::with_capacity(files.total());
        let mut entities = EntitySet::default();

        for modality in Modality::ALL {
            for path in files.paths(modality) {
                let meta = validate_file(path);
                let valid = meta.valid;
                metadata.push(meta);
                if !valid {
                    warn!(case_id, path = %path.display(), "evidence file not found");
                    continue;
                }

                let outcome = extract_text(generator, modality, path).await;
                let entry = bundle.push(modality, outcome);
                let Some(text) = entry.text() else {
                    if let Err(e) = &entry.outcome {
                        warn!(case_id, label = %entry.label, error = %e, "extraction failed");
                    }
                    continue;
                };
                info!(case_id, label = %entry.label, chars = text.len(), "extracted evidence text");

                let found =
                    extract_entities(generator, text, self.entity_max_tokens, self.retries).await;
                info!(
                    case_id,
                    persons = found.persons.len(),
                    dates = found.dates.len(),
                    events = found.timeline_events.len(),
                    "entities found"
                );
                entities.extend(found);
            }
        }
        entities.dedup();

        let mut fused = fuse_evidence(case_id, &bundle, &metadata, &entities);

        if self.assess_relevance {
            fused.document_relevance = self.assess_documents(generator, &bundle).await;
        }

        let combined: Vec<&str> = bundle.successful().map(|(_, text)| text).collect();
        fused.completeness_assessment = self.validate(generator, &combined.join("\n")).await;

        info!(
            case_id,
            completeness = fused.data_quality.completeness_score,
            entities = fused.data_quality.entities_extracted,
            "evidence analysis complete"
        );
        fused
    }

    async fn assess_documents(
        &self,
        generator: &dyn Generator,
        bundle: &EvidenceBundle,
    ) -> BTreeMap<String, DocumentRelevance> {
        let mut scores = BTreeMap::new();
        for (label, text) in bundle.successful() {
            let relevance = self.assess_relevance(generator, text).await;
            info!(
                label,
                score = relevance.relevance_score,
                category = %relevance.relevance_category,
                "document relevance"
            );
            scores.insert(label.to_string(), relevance);
        }
        scores
    }

    /// Model-scored relevance of one document.
    ///
    /// An exhausted call scores 0.5 (`unknown`); a reply that is not strict
    /// JSON scores 0.6 (`unclassified`).
    pub async fn assess_relevance(
        &self,
        generator: &dyn Generator,
        document_text: &str,
    ) -> DocumentRelevance {
        let response = safe_generate(
            generator,
            &relevance_prompt(document_text),
            self.entity_max_tokens,
            self.retries,
        )
        .await;
        tokio::time::sleep(self.throttle).await;

        if is_generation_failure(&response) {
            return relevance_fallback(0.5, "unknown");
        }
        let Some(parsed) = parse_strict(response.trim()) else {
            return relevance_fallback(0.6, "unclassified");
        };
        let score = parsed
            .get("relevance_score")
            .and_then(Value::as_f64)
            .unwrap_or(50.0);
        DocumentRelevance {
            relevance_score: score.clamp(0.0, 100.0) / 100.0,
            key_information: parsed
                .get("key_information")
                .and_then(value_as_text)
                .unwrap_or_default(),
            relevance_category: parsed
                .get("relevance_category")
                .and_then(value_as_text)
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// Ask the model what the evidence covers and what it lacks.
    ///
    /// Returns `None` when the call is exhausted or the reply unparsable.
    pub async fn validate(
        &self,
        generator: &dyn Generator,
        combined_text: &str,
    ) -> Option<CompletenessAssessment> {
        let response = safe_generate(
            generator,
            &validation_prompt(combined_text),
            self.entity_max_tokens,
            self.retries,
        )
        .await;
        tokio::time::sleep(self.throttle).await;

        if is_generation_failure(&response) {
            warn!("completeness validation gave up after retries");
            return None;
        }
        let parsed = parse_json(&response);
        if parsed.is_empty() {
            warn!("completeness validation reply unparsable");
            return None;
        }
        let readiness = parsed
            .get("readiness_score")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_READINESS);
        Some(CompletenessAssessment {
            present_information: coerce_strings(parsed.get("present_info")),
            missing_information: coerce_strings(parsed.get("missing_info")),
            case_readiness: readiness / 100.0,
        })
    }
}

fn relevance_fallback(score: f64, category: &str) -> DocumentRelevance {
    DocumentRelevance {
        relevance_score: score,
        key_information: String::new(),
        relevance_category: category.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyaya_ai::scripted::ScriptedGenerator;
    use std::path::PathBuf;
    use tokio::time::Instant;

    const ENTITIES: &str = "Extract structured data";
    const VALIDATION: &str = "Review this case evidence";
    const RELEVANCE: &str = "Analyze this legal document";

    fn quick() -> EvidenceChecker {
        EvidenceChecker {
            retries: 1,
            throttle: Duration::ZERO,
            ..Default::default()
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn fuses_documents_and_skips_missing_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut files = EvidenceFiles::default();
        files.push(
            Modality::Document,
            write(&dir, "complaint.txt", "The buyer paid Rs 50,000 to the seller on 1 March."),
        );
        files.push(Modality::Document, dir.path().join("missing.txt"));
        files.push(Modality::Audio, write(&dir, "call.mp3", "ID3"));

        let g = ScriptedGenerator::new()
            .reply(
                ENTITIES,
                r#"{"persons": ["Seller", "Buyer"], "dates": ["1 March"],
                    "legal_references": ["ICA 73"]}"#,
            )
            .reply(
                VALIDATION,
                r#"{"present_info": ["payment"], "missing_info": ["receipt"], "readiness_score": 70}"#,
            );

        let fused = quick().analyze(&g, "c1", &files).await;

        assert_eq!(fused.integrity_check.total_files, 3);
        assert!(!fused.integrity_check.all_files_valid);
        assert_eq!(fused.source_files.len(), 2);
        // The audio file fails transcription, so only one entity call is made.
        assert_eq!(g.call_count(ENTITIES), 1);
        assert!(fused.fused_data.combined_text.starts_with("[document_0]\nThe buyer"));
        assert_eq!(fused.fused_data.key_entities.persons, vec!["Buyer", "Seller"]);
        assert!((fused.data_quality.completeness_score - 0.6).abs() < 1e-9);

        let assessment = fused.completeness_assessment.unwrap();
        assert_eq!(assessment.missing_information, vec!["receipt"]);
        assert!((assessment.case_readiness - 0.7).abs() < 1e-9);
        assert!(fused.document_relevance.is_empty());
        assert_eq!(g.call_count(RELEVANCE), 0);
    }

    #[tokio::test]
    async fn validation_defaults_readiness() {
        let g = ScriptedGenerator::new().reply(VALIDATION, r#"{"present_info": "parties named"}"#);
        let assessment = quick().validate(&g, "text").await.unwrap();
        assert_eq!(assessment.present_information, vec!["parties named"]);
        assert!(assessment.missing_information.is_empty());
        assert!((assessment.case_readiness - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unparsable_validation_is_none() {
        let g = ScriptedGenerator::new().reply(VALIDATION, "Looks fine to me.");
        assert!(quick().validate(&g, "text").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn relevance_scores_and_fallbacks() {
        let checker = EvidenceChecker {
            retries: 1,
            ..Default::default()
        };

        let g = ScriptedGenerator::new().reply(
            RELEVANCE,
            r#"{"relevance_score": 140, "key_information": "payment proof", "relevance_category": "evidence"}"#,
        );
        let start = Instant::now();
        let r = checker.assess_relevance(&g, "receipt").await;
        assert_eq!(r.relevance_score, 1.0);
        assert_eq!(r.relevance_category, "evidence");
        assert_eq!(start.elapsed(), Duration::from_secs(2));

        let g = ScriptedGenerator::new().reply(RELEVANCE, "```json\n{\"relevance_score\": 80}\n```");
        let r = checker.assess_relevance(&g, "receipt").await;
        assert_eq!(r.relevance_score, 0.6);
        assert_eq!(r.relevance_category, "unclassified");

        let g = ScriptedGenerator::new().fail(RELEVANCE);
        let r = checker.assess_relevance(&g, "receipt").await;
        assert_eq!(r.relevance_score, 0.5);
        assert_eq!(r.relevance_category, "unknown");
    }

    #[tokio::test]
    async fn relevance_runs_per_document_when_enabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut files = EvidenceFiles::default();
        files.push(Modality::Document, write(&dir, "a.txt", "first"));
        files.push(Modality::Document, write(&dir, "b.txt", "second"));
        let g = ScriptedGenerator::new().reply(RELEVANCE, r#"{"relevance_score": 30}"#);
        let checker = EvidenceChecker {
            assess_relevance: true,
            ..quick()
        };
        let fused = checker.analyze(&g, "c1", &files).await;
        let labels: Vec<&String> = fused.document_relevance.keys().collect();
        assert_eq!(labels, vec!["document_0", "document_1"]);
        assert_eq!(fused.document_relevance["document_1"].relevance_score, 0.3);
    }
}
