//! Legal-action stage: judge-facing analysis of a summarized case.

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use nyaya_core::judicial::JudicialAnalysis;

use crate::generator::{DEFAULT_RETRIES, Generator, is_generation_failure, safe_generate};
use crate::parse::{extract_laws_and_sections, parse_json};
use crate::prompt::judge_prompt;
use crate::statutes::{extract_keywords, search_sections};

pub const ANALYSIS_MAX_TOKENS: u32 = 2000;

/// Candidate statutes listed in the judge prompt.
const MAX_CANDIDATE_STATUTES: usize = 8;

#[derive(Debug, Error)]
pub enum LegalActionError {
    #[error("legal analysis generation failed after retries")]
    GenerationFailed,

    #[error("Failed to parse legal analysis")]
    Unparsable,
}

#[derive(Debug, Clone)]
pub struct LegalActionAgent {
    pub retries: u32,
}

impl Default for LegalActionAgent {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
        }
    }
}

impl LegalActionAgent {
    pub fn new(retries: u32) -> Self {
        Self { retries }
    }

    /// Ask the model for a judicial analysis of the case.
    ///
    /// Statutes from the built-in table whose keywords occur in the case
    /// text are offered to the model as candidates. When the reply carries
    /// no `applicable_laws`, references found in its free text fill them.
    pub async fn recommend(
        &self,
        generator: &dyn Generator,
        case_description: &str,
        evidence_summary: &str,
    ) -> Result<JudicialAnalysis, LegalActionError> {
        let statutes = candidate_statutes(&format!("{case_description}\n{evidence_summary}"));
        debug!(candidates = statutes.len(), "candidate statutes");

        let prompt = judge_prompt(case_description, evidence_summary, &statutes);
        let response = safe_generate(generator, &prompt, ANALYSIS_MAX_TOKENS, self.retries).await;
        if is_generation_failure(&response) {
            return Err(LegalActionError::GenerationFailed);
        }

        let mut parsed = parse_json(&response);
        if parsed.is_empty() {
            warn!(response_len = response.len(), "legal analysis unparsable");
            return Err(LegalActionError::Unparsable);
        }

        let has_laws = matches!(parsed.get("applicable_laws"), Some(Value::Array(a)) if !a.is_empty());
        if !has_laws {
            let found: Vec<Value> = extract_laws_and_sections(&response)
                .into_iter()
                .map(|r| json!({"law_name": r.law, "section": r.section, "relevance": r.relevance}))
                .collect();
            if !found.is_empty() {
                debug!(count = found.len(), "filled applicable laws from free text");
                parsed.insert("applicable_laws".to_string(), Value::Array(found));
            }
        }

        let analysis = JudicialAnalysis::new(parsed);
        info!(
            confidence = analysis.primary_confidence(),
            laws = analysis.applicable_laws().len(),
            precedents = analysis.precedent_count(),
            "judicial analysis ready"
        );
        Ok(analysis)
    }
}

fn candidate_statutes(case_text: &str) -> Vec<String> {
    let keywords = extract_keywords(case_text);
    if keywords.is_empty() {
        return Vec::new();
    }
    search_sections(&keywords)
        .iter()
        .take(MAX_CANDIDATE_STATUTES)
        .map(|m| m.display_line())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedGenerator;

    const JUDGE: &str = "assisting a JUDGE";

    #[tokio::test]
    async fn parses_analysis_and_confidence() {
        let reply = r#"{
  "case_strength": {"overall_verdict_likelihood": "72%"},
  "applicable_laws": [{"law_name": "Indian Contract Act", "section": "73", "relevance": "damages"}],
  "precedent_cases": [{"case_citation": "Hadley v. Baxendale"}],
}"#;
        let g = ScriptedGenerator::new().reply(JUDGE, reply);
        let analysis = LegalActionAgent::new(1)
            .recommend(&g, "Sharma v. Gupta (civil)", "Seller failed to deliver goods.")
            .await
            .unwrap();
        assert_eq!(analysis.primary_confidence(), 72);
        assert_eq!(analysis.applicable_laws().len(), 1);
        assert_eq!(analysis.precedent_count(), 1);
        assert_eq!(g.last_params().map(|p| p.max_new_tokens), Some(2000));
    }

    #[tokio::test]
    async fn candidate_statutes_follow_case_keywords() {
        let g = ScriptedGenerator::new().reply(JUDGE, r#"{"case_strength": {}}"#);
        LegalActionAgent::new(1)
            .recommend(&g, "Complaint of cheating", "Accused obtained money by fraud.")
            .await
            .unwrap();
        let prompt = &g.calls()[0];
        assert!(prompt.contains("CANDIDATE STATUTES:\nIPC 420 (Indian Penal Code)"));
    }

    #[tokio::test]
    async fn free_text_laws_fill_missing_list() {
        let reply = r#"{"case_strength": {"overall_verdict_likelihood": 40}}
Relevant: Section 73 of the Indian Contract Act"#;
        let g = ScriptedGenerator::new().reply(JUDGE, reply);
        let analysis = LegalActionAgent::new(1).recommend(&g, "c", "e").await.unwrap();
        let laws = analysis.applicable_laws();
        assert_eq!(laws.len(), 1);
        assert_eq!(laws[0]["section"], "73");
        assert_eq!(laws[0]["relevance"], "Applicable to this case");
    }

    #[tokio::test]
    async fn unparsable_reply_is_an_error() {
        let g = ScriptedGenerator::new().reply(JUDGE, "The court should consider the facts.");
        let err = LegalActionAgent::new(1).recommend(&g, "c", "e").await.unwrap_err();
        assert!(matches!(err, LegalActionError::Unparsable));
        assert_eq!(err.to_string(), "Failed to parse legal analysis");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_are_an_error() {
        let g = ScriptedGenerator::new().fail(JUDGE);
        let err = LegalActionAgent::default().recommend(&g, "c", "e").await.unwrap_err();
        assert!(matches!(err, LegalActionError::GenerationFailed));
        assert_eq!(g.call_count(JUDGE), 3);
    }
}
