//! Confidence scoring for pipeline outputs.
//!
//! All functions are pure. Summary-style scores live in `[0, 1]`; the action
//! score is an integer percentage in `[0, 100]`.

use crate::evidence::EntitySet;

/// Confidence for a summary given a response-quality estimate and counts of
/// extracted entities and law references.
///
/// `quality * 0.6` plus two bonuses. Each bonus is capped at 0.2 and then
/// scaled by a further 0.2, so neither can contribute more than 0.04.
/// The nested scaling is kept as-is pending a product decision.
///
/// Not called by the pipeline, which scores summaries with
/// [`summary_record_confidence`]. Exported for callers that have a quality
/// estimate of their own.
pub fn calculate_summary_confidence(
    response_quality: f64,
    entity_count: usize,
    law_references: usize,
) -> f64 {
    let base = response_quality.clamp(0.0, 1.0) * 0.6;
    let entity_bonus = (entity_count as f64 / 10.0).min(0.2) * 0.2;
    let law_bonus = (law_references as f64 / 5.0).min(0.2) * 0.2;
    (base + entity_bonus + law_bonus).min(1.0)
}

/// Integer confidence percentage for a legal-action recommendation.
///
/// Precedent match ratio (3 precedents saturate) weighted 30, law clarity
/// and evidence strength weighted 35 each. Inputs are clamped to `[0, 1]`.
///
/// Not called by the pipeline: the stored legal confidence is the model's
/// own verdict likelihood. Exported for callers that score recommendations
/// themselves.
pub fn calculate_action_confidence(
    matching_precedents: usize,
    law_clarity: f64,
    evidence_strength: f64,
) -> u32 {
    let precedent_score = (matching_precedents as f64 / 3.0).min(1.0) * 30.0;
    let law_score = law_clarity.clamp(0.0, 1.0) * 35.0;
    let evidence_score = evidence_strength.clamp(0.0, 1.0) * 35.0;
    (precedent_score + law_score + evidence_score).min(100.0) as u32
}

/// Confidence of a parsed summary record from its text length, issue count,
/// and fact count.
///
/// 100 words, 3 issues, and 5 facts each saturate their term.
pub fn summary_record_confidence(summary_text: &str, legal_issues: usize, facts: usize) -> f64 {
    let words = summary_text.split_whitespace().count();
    let text_score = (words as f64 / 100.0).min(1.0) * 0.4;
    let issues_score = (legal_issues as f64 / 3.0).min(1.0) * 0.3;
    let facts_score = (facts as f64 / 5.0).min(1.0) * 0.3;
    (text_score + issues_score + facts_score).min(1.0)
}

/// Bring a model-reported confidence into `[0, 1]`.
///
/// Values above 1 are read as percentages. The result is clamped.
pub fn normalize_confidence(value: f64) -> f64 {
    let value = if value > 1.0 { value / 100.0 } else { value };
    value.clamp(0.0, 1.0)
}

/// Fraction of key entity categories that were populated, in steps of 0.2.
pub fn completeness_score(entities: &EntitySet) -> f64 {
    let populated = [
        !entities.persons.is_empty(),
        !entities.dates.is_empty(),
        !entities.witness_statements.is_empty(),
        !entities.timeline_events.is_empty(),
        !entities.legal_references.is_empty(),
    ];
    let score: f64 = populated.iter().filter(|p| **p).map(|_| 0.2).sum();
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::TimelineEvent;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_confidence_bonuses_cap_at_004() {
        assert!(close(calculate_summary_confidence(1.0, 0, 0), 0.6));
        assert!(close(calculate_summary_confidence(1.0, 1000, 0), 0.64));
        assert!(close(calculate_summary_confidence(1.0, 1000, 1000), 0.68));
        assert!(close(calculate_summary_confidence(0.0, 1, 0), 0.02));
    }

    #[test]
    fn action_confidence_is_integer_percentage() {
        assert_eq!(calculate_action_confidence(0, 0.0, 0.0), 0);
        assert_eq!(calculate_action_confidence(3, 1.0, 1.0), 100);
        assert_eq!(calculate_action_confidence(1, 0.5, 0.5), 45);
        assert_eq!(calculate_action_confidence(99, 5.0, 5.0), 100);
    }

    #[test]
    fn summary_record_terms() {
        let text = vec!["word"; 50].join(" ");
        // 0.5*0.4 + 1*0.3 + 0.4*0.3
        assert!(close(summary_record_confidence(&text, 3, 2), 0.62));
        assert!(close(summary_record_confidence("", 0, 0), 0.0));
        let long = vec!["word"; 500].join(" ");
        assert!(close(summary_record_confidence(&long, 30, 50), 1.0));
    }

    #[test]
    fn model_confidence_normalized() {
        assert!(close(normalize_confidence(0.85), 0.85));
        assert!(close(normalize_confidence(85.0), 0.85));
        assert!(close(normalize_confidence(1.0), 1.0));
        assert_eq!(normalize_confidence(250.0), 1.0);
        assert_eq!(normalize_confidence(-3.0), 0.0);
    }

    #[test]
    fn completeness_counts_five_categories() {
        let mut e = EntitySet::default();
        assert_eq!(completeness_score(&e), 0.0);
        e.persons.push("A".into());
        e.locations.push("Pune".into());
        assert!(close(completeness_score(&e), 0.2));
        e.dates.push("d".into());
        e.witness_statements.push("w".into());
        e.legal_references.push("IPC 420".into());
        e.timeline_events.push(TimelineEvent::default());
        assert!(close(completeness_score(&e), 1.0));
    }
}
