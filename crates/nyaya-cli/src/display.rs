//! Vertical card display for case status and analysis results.

use nyaya_core::CaseRecord;
use nyaya_pipeline::report::{ConfidenceScores, StageReport};
use nyaya_pipeline::{AnalysisReport, StatusReport};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

pub fn print_status_card(status: &StatusReport) {
    println!("=== {} ===", status.case_id);
    println!();

    println!("Status");
    field("analysis_status", status.analysis_status);
    flag("evidence_checking", status.stages_completed.evidence_checking);
    flag("summarization", status.stages_completed.summarization);
    flag("legal_action_analysis", status.stages_completed.legal_action_analysis);
    if let Some(ts) = &status.timestamp {
        field("timestamp", ts);
    }
    if let Some(error) = &status.error {
        field("error", error);
    }
    println!();

    print_confidences(&status.confidence_scores);
}

/// Print a fresh analysis as a card grouped by stage.
pub fn print_report_card(report: &AnalysisReport) {
    println!("=== {} ===", report.case_id);
    println!();

    println!("Stages");
    stage("evidence_checking", &report.stages.evidence_checking);
    stage("summarization", &report.stages.summarization);
    stage("legal_action", &report.stages.legal_action);
    println!();

    println!("Evidence");
    let entities = &report.evidence.key_entities;
    list("persons", &entities.persons);
    list("dates", &entities.dates);
    list("money_amounts", &entities.money_amounts);
    list("legal_references", &report.evidence.legal_references);
    field("timeline_events", report.evidence.timeline.len());
    println!();

    println!("Summary");
    if !report.summary.summary.is_empty() {
        field("summary", &report.summary.summary);
    }
    list("facts", &report.summary.facts);
    list("legal_issues", &report.summary.legal_issues);
    println!();

    println!("Judicial Analysis");
    field("verdict_likelihood", format!("{}%", report.judicial_confidence));
    list("applicable_laws", &report.applicable_laws_display);
    if !report.legal_suggestions.is_empty() {
        println!("  suggestions ({}):", report.legal_suggestions.len());
        for s in report.legal_suggestions.iter().take(MAX_LIST_ITEMS) {
            let confidence = s
                .confidence
                .map(|c| format!(" {c}%"))
                .unwrap_or_default();
            println!("    - [{}{}] {}", s.priority, confidence, s.suggested_action);
        }
    }
    println!();

    print_confidences(&report.confidence_scores);
}

/// One line per case: id, status, title.
pub fn print_case_table(records: &[CaseRecord]) {
    if records.is_empty() {
        println!("(no cases)");
        return;
    }
    println!("{:<20} {:<12} title", "case_id", "status");
    for r in records {
        println!("{:<20} {:<12} {}", r.case_id, r.analysis_status, r.title);
    }
}

// ── Field rendering ──

fn print_confidences(scores: &ConfidenceScores) {
    println!("Confidence");
    for (name, score) in [
        ("evidence", scores.evidence),
        ("summary", scores.summary),
        ("legal_actions", scores.legal_actions),
    ] {
        match score {
            Some(v) => println!("  {:<26} {v:.2}", name),
            None => println!("  {:<26} -", name),
        }
    }
    println!();
}

fn stage(name: &str, report: &StageReport) {
    println!(
        "  {:<26} {} ({:.2}) {}",
        name, report.status, report.confidence, report.summary
    );
}

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", name, value);
}

fn flag(name: &str, value: bool) {
    field(name, if value { "yes" } else { "no" });
}

fn list(name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    if items.len() <= 3 && items.iter().all(|i| i.len() < 40) {
        println!("  {:<26} {}", name, items.join(", "));
        return;
    }
    println!("  {} ({}):", name, items.len());
    for item in items.iter().take(MAX_LIST_ITEMS) {
        println!("    - {item}");
    }
    if items.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", items.len() - MAX_LIST_ITEMS);
    }
}
