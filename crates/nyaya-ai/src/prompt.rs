//! Prompt templates and token-budget compression.

use tracing::{info, warn};

use nyaya_core::fusion::FusedData;

use crate::error::LlmError;
use crate::generator::Generator;
use crate::tokens::truncate_chars;

/// Token budget for the facts section of the summarizer prompt.
pub const FACTS_TOKEN_BUDGET: usize = 1500;

/// Token budget for the witness-statements section of the summarizer prompt.
pub const STATEMENTS_TOKEN_BUDGET: usize = 800;

const COMPRESS_INSTRUCTION: &str = "Summarize the following content in 5-7 sentences:";
const COMPRESS_MAX_TOKENS: u32 = 256;
const TOKENS_PER_WORD: f64 = 1.5;
const MIN_WORDS_PER_CHUNK: usize = 100;

/// Shrink `text` towards `max_tokens` by summarizing word chunks.
///
/// Text already within budget comes back unchanged. Otherwise each chunk of
/// roughly `max_tokens / 2` tokens is summarized, the summaries are joined,
/// and the result is summarized once more if still over budget. Anything
/// still over budget after that is truncated. The result never reports more
/// tokens than the input; if it would, the input is returned instead.
pub async fn compress_text(
    generator: &dyn Generator,
    text: &str,
    max_tokens: usize,
) -> Result<String, LlmError> {
    let original_tokens = generator.count_tokens(text).await;
    if original_tokens <= max_tokens {
        return Ok(text.to_string());
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let words_per_chunk =
        ((max_tokens as f64 / TOKENS_PER_WORD / 2.0) as usize).max(MIN_WORDS_PER_CHUNK);
    let params = generator.default_params().with_max_tokens(COMPRESS_MAX_TOKENS);

    info!(
        original_tokens,
        max_tokens,
        chunks = words.len().div_ceil(words_per_chunk),
        "compressing text"
    );

    let mut summaries = Vec::new();
    for chunk in words.chunks(words_per_chunk) {
        let prompt = format!("{COMPRESS_INSTRUCTION}\n\n{}", chunk.join(" "));
        summaries.push(generator.generate(&prompt, &params).await?);
    }

    let mut merged = summaries.join(" ");
    if generator.count_tokens(&merged).await > max_tokens {
        let prompt = format!("{COMPRESS_INSTRUCTION}\n\n{merged}");
        merged = generator.generate(&prompt, &params).await?;
    }
    if generator.count_tokens(&merged).await > max_tokens {
        merged = generator.truncate_to_token_limit(&merged, max_tokens);
    }

    let compressed_tokens = generator.count_tokens(&merged).await;
    if compressed_tokens > original_tokens {
        warn!(
            original_tokens,
            compressed_tokens, "compression grew the text, keeping original"
        );
        return Ok(text.to_string());
    }
    Ok(merged)
}

/// The main summarizer prompt over fused evidence.
///
/// Facts and witness statements are compressed to their token budgets first.
pub async fn build_summarizer_prompt(
    generator: &dyn Generator,
    fused: &FusedData,
) -> Result<String, LlmError> {
    let facts = compress_text(generator, &fused.facts.join("\n"), FACTS_TOKEN_BUDGET).await?;
    let statements = compress_text(
        generator,
        &fused.witness_statements.join("\n"),
        STATEMENTS_TOKEN_BUDGET,
    )
    .await?;
    let legal_refs = fused.legal_references.join(", ");

    Ok(format!(
        "\nYou are an expert Indian legal summarizer. Produce JSON summary.\n\n\
         FACTS:\n{facts}\n\n\
         WITNESS STATEMENTS:\n{statements}\n\n\
         LEGAL REFERENCES:\n{legal_refs}\n\n\
         Return JSON with: facts, legal_issues, summary, confidence_score\n"
    ))
}

/// Characters of evidence text sent for entity extraction.
pub const ENTITY_TEXT_CHARS: usize = 6000;

pub fn entity_extraction_prompt(text: &str) -> String {
    format!(
        "You are an expert legal analyst. Extract structured data from the following legal text.\n\
         Return a valid JSON object with the following keys:\n\
         - persons: List of names of people involved.\n\
         - organizations: List of organizations, companies, or institutions.\n\
         - dates: List of specific dates mentioned.\n\
         - locations: List of addresses, cities, or locations.\n\
         - money_amounts: List of financial figures/amounts.\n\
         - legal_references: List of acts, sections, or case laws cited.\n\
         - witness_statements: List of key quotes, testimonies, or assertions made by witnesses/parties.\n\
         - timeline_events: List of objects, each with 'date' and 'description' fields, \
         representing the chronological sequence of events.\n\n\
         TEXT:\n{}\n\nJSON:",
        truncate_chars(text, ENTITY_TEXT_CHARS)
    )
}

/// Characters of combined evidence sent for the completeness review.
pub const VALIDATION_TEXT_CHARS: usize = 2000;

pub fn validation_prompt(combined_text: &str) -> String {
    format!(
        "Review this case evidence and identify:\n\
         1. What important information is present (3-5 items)\n\
         2. What critical information might be missing (3-5 items)\n\
         3. Overall case readiness (percentage 0-100)\n\n\
         EVIDENCE SUMMARY:\n{}\n\n\
         Respond in JSON format: {{\"present_info\": [...], \"missing_info\": [...], \"readiness_score\": <number>}}",
        truncate_chars(combined_text, VALIDATION_TEXT_CHARS)
    )
}

/// Characters of a single document sent for relevance scoring.
pub const RELEVANCE_TEXT_CHARS: usize = 1000;

pub fn relevance_prompt(document_text: &str) -> String {
    format!(
        "Analyze this legal document and provide:\n\
         1. Relevance score (0-100): How relevant is this to a legal case analysis?\n\
         2. Key information: What are the 2-3 most important pieces of information?\n\
         3. Category: Is it (evidence/statement/document/contract/other)?\n\n\
         DOCUMENT:\n{}\n\n\
         Respond in JSON format: {{\"relevance_score\": <number>, \"key_information\": \"<text>\", \"relevance_category\": \"<category>\"}}",
        truncate_chars(document_text, RELEVANCE_TEXT_CHARS)
    )
}

pub fn chunk_summary_prompt(chunk: &str) -> String {
    format!(
        "Summarize the following legal evidence chunk:\n\n{chunk}\n\n\
         Return JSON with:\n- summary_text\n- confidence_score\n"
    )
}

/// Judge-facing analysis prompt with a fixed JSON schema.
///
/// `statutes` are optional candidate provisions listed for the model to
/// consider; the section is omitted when empty.
pub fn judge_prompt(case_description: &str, evidence_summary: &str, statutes: &[String]) -> String {
    let statutes = if statutes.is_empty() {
        String::new()
    } else {
        format!("CANDIDATE STATUTES:\n{}\n\n", statutes.join("\n"))
    };
    format!(
        r#"You are an expert legal advisor assisting a JUDGE in evaluating a consumer dispute case.

CASE DETAILS:
{case_description}

EVIDENCE ANALYSIS:
{evidence_summary}

{statutes}JUDGE'S DECISION SUPPORT:
Analyze this case and provide judicial guidance in the following JSON format:

{{
  "case_strength": {{
    "overall_verdict_likelihood": "percentage (0-100)",
    "complainant_favorable_probability": "percentage",
    "defendant_favorable_probability": "percentage",
    "reasoning": "brief explanation of verdict likelihood"
  }},
  "applicable_laws": [
    {{
      "law_name": "Act/Section name",
      "section": "exact section number",
      "relevance": "how it applies to this case",
      "complainant_favors": true/false,
      "precedent_strength": "Strong/Moderate/Weak"
    }}
  ],
  "critical_evidence_assessment": [
    {{
      "evidence_item": "what evidence",
      "judicial_weight": "High/Medium/Low",
      "supports_complainant": true/false,
      "reasoning": "why judge should weight this"
    }}
  ],
  "key_judgment_factors": [
    "factor 1 for verdict decision",
    "factor 2 for verdict decision"
  ],
  "judicial_recommendations": {{
    "suggested_verdict": "Partial/Full/No relief",
    "relief_amount_suggested": "amount if applicable",
    "reasoning": "detailed reasoning for suggested verdict",
    "alternative_scenarios": [
      "if judge finds X, then Y"
    ]
  }},
  "precedent_cases": [
    {{
      "case_citation": "Case Name v. Other Party",
      "year": "year decided",
      "similar_facts": "what facts are similar to current case",
      "judicial_holding": "what the court decided",
      "applicability": "how it applies here"
    }}
  ]
}}

Provide ONLY valid JSON. No markdown fences, no comments, no trailing commas."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedGenerator;
    use crate::tokens::approx_token_count;

    #[tokio::test]
    async fn within_budget_is_unchanged() {
        let g = ScriptedGenerator::new();
        let out = compress_text(&g, "short text", 100).await.unwrap();
        assert_eq!(out, "short text");
        assert!(g.calls().is_empty());
    }

    #[tokio::test]
    async fn chunks_are_summarized_and_joined() {
        let g = ScriptedGenerator::new().reply(COMPRESS_INSTRUCTION, "brief");
        // 2499 chars is 625 tokens; a budget of 150 still gives 100-word chunks.
        let text = vec!["evidence."; 250].join(" ");
        let out = compress_text(&g, &text, 150).await.unwrap();
        assert_eq!(out, "brief brief brief");
        assert_eq!(g.call_count(COMPRESS_INSTRUCTION), 3);
        assert_eq!(g.last_params().map(|p| p.max_new_tokens), Some(256));
    }

    #[tokio::test]
    async fn second_pass_then_hard_truncation() {
        let long_summary = "x".repeat(400);
        let g = ScriptedGenerator::new().reply(COMPRESS_INSTRUCTION, &long_summary);
        let text = vec!["word"; 600].join(" ");
        let out = compress_text(&g, &text, 50).await.unwrap();
        // 6 chunk calls plus one merge pass, then truncated to 50 tokens.
        assert_eq!(g.call_count(COMPRESS_INSTRUCTION), 7);
        assert_eq!(out.len(), 200);
        assert!(approx_token_count(&out) <= 50);
    }

    #[tokio::test]
    async fn summarizer_prompt_layout() {
        let g = ScriptedGenerator::new();
        let fused = FusedData {
            facts: vec!["Goods were paid for".into(), "Goods never arrived".into()],
            witness_statements: vec!["I saw the payment".into()],
            legal_references: vec!["IPC 420".into(), "ICA 73".into()],
            ..Default::default()
        };
        let prompt = build_summarizer_prompt(&g, &fused).await.unwrap();
        assert!(prompt.contains("FACTS:\nGoods were paid for\nGoods never arrived\n"));
        assert!(prompt.contains("WITNESS STATEMENTS:\nI saw the payment\n"));
        assert!(prompt.contains("LEGAL REFERENCES:\nIPC 420, ICA 73\n"));
        assert!(prompt.contains("Return JSON with: facts, legal_issues, summary, confidence_score"));
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        #[test]
        fn compression_never_grows(words in 1usize..900, budget in 10usize..400, reply_len in 0usize..3000) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let reply = "y".repeat(reply_len);
            let g = ScriptedGenerator::new().reply(COMPRESS_INSTRUCTION, &reply);
            let text = vec!["word"; words].join(" ");
            let out = rt.block_on(compress_text(&g, &text, budget)).unwrap();
            proptest::prop_assert!(approx_token_count(&out) <= approx_token_count(&text));
        }
    }

    #[test]
    fn templates_truncate_evidence() {
        let text = "a".repeat(10_000);
        assert!(entity_extraction_prompt(&text).contains(&"a".repeat(6000)));
        assert!(!entity_extraction_prompt(&text).contains(&"a".repeat(6001)));
        assert!(!validation_prompt(&text).contains(&"a".repeat(2001)));
        assert!(!relevance_prompt(&text).contains(&"a".repeat(1001)));
    }

    #[test]
    fn judge_prompt_optional_statutes() {
        let without = judge_prompt("Sharma v. Gupta", "unpaid goods", &[]);
        assert!(!without.contains("CANDIDATE STATUTES"));
        assert!(without.contains("\"overall_verdict_likelihood\""));
        let with = judge_prompt("c", "e", &["IPC 420: Cheating".into()]);
        assert!(with.contains("CANDIDATE STATUTES:\nIPC 420: Cheating\n\nJUDGE'S DECISION SUPPORT"));
    }
}
