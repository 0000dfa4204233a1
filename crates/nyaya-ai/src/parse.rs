//! Repair and parse model responses.
//!
//! [`parse_json`] runs an ordered chain of stages, each a pure function that
//! either yields a JSON object or passes. The chain never fails: when every
//! stage passes the result is an empty map. [`extract_sections`] is a
//! separate reader for plain-text answers with `FACTS:` / `SUMMARY:` headers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use nyaya_core::confidence::normalize_confidence;

use crate::literal::parse_literal;

pub type JsonObject = Map<String, Value>;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]\}])").expect("valid regex"));
static SINGLE_QUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*?)'(\s*:)").expect("valid regex"));
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*?)'").expect("valid regex"));

// ── JSON repair chain ──

/// Parse a model response into a JSON object, repairing common damage.
///
/// Stages, first success wins: extract a candidate, strict parse, strip
/// comments and trailing commas, permissive literal parse, single-quote
/// coercion. Returns an empty map when nothing works.
pub fn parse_json(response: &str) -> JsonObject {
    let Some(candidate) = extract_candidate(response) else {
        debug!("no JSON candidate in response");
        return JsonObject::new();
    };
    if let Some(obj) = parse_strict(&candidate) {
        return obj;
    }
    let cleaned = strip_comments_and_commas(&candidate);
    if let Some(obj) = parse_strict(&cleaned) {
        debug!("parsed after comment/comma cleanup");
        return obj;
    }
    if let Some(obj) = parse_literal_object(&cleaned) {
        debug!("parsed as literal expression");
        return obj;
    }
    if let Some(obj) = parse_strict(&coerce_quotes(&cleaned)) {
        debug!("parsed after quote coercion");
        return obj;
    }
    debug!(len = response.len(), "response could not be parsed as JSON");
    JsonObject::new()
}

/// The text most likely to hold the JSON payload.
///
/// The body of the first fenced block (optionally tagged `json`) if there is
/// one; otherwise the span from the first `{` to the brace that balances it,
/// or to the end of the text when it never balances. `None` when there is no
/// fence and no `{`.
pub fn extract_candidate(response: &str) -> Option<String> {
    if let Some(caps) = FENCE.captures(response) {
        return Some(caps[1].trim().to_string());
    }
    let start = response.find('{')?;
    let tail = &response[start..];
    let mut depth = 0usize;
    for (i, ch) in tail.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(tail[..=i].to_string());
                }
            }
            _ => {}
        }
    }
    Some(tail.to_string())
}

/// Strict JSON parse; only objects count.
pub fn parse_strict(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Remove `/* */` and `//` comments and commas directly before `]` or `}`.
pub fn strip_comments_and_commas(candidate: &str) -> String {
    let cleaned = BLOCK_COMMENT.replace_all(candidate, "");
    let cleaned = LINE_COMMENT.replace_all(&cleaned, "");
    TRAILING_COMMA.replace_all(&cleaned, "${1}").into_owned()
}

/// Parse as a Python-style literal and keep it only if it is a dict.
pub fn parse_literal_object(cleaned: &str) -> Option<JsonObject> {
    match parse_literal(cleaned) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Best-effort single-to-double quote conversion: keys first (a quoted run
/// followed by `:`), then every remaining quoted run, then trailing commas.
pub fn coerce_quotes(cleaned: &str) -> String {
    let coerced = SINGLE_QUOTED_KEY.replace_all(cleaned, "\"${1}\"${2}");
    let coerced = SINGLE_QUOTED.replace_all(&coerced, "\"${1}\"");
    TRAILING_COMMA.replace_all(&coerced, "${1}").into_owned()
}

// ── Plain-text sections ──

static FACTS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)FACTS?:").expect("valid regex"));
static FACTS_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)LEGAL|ISSUES?|SUMMARY").expect("valid regex"));
static ISSUES_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:LEGAL\s+ISSUES?|ISSUES?):").expect("valid regex"));
static ISSUES_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SUMMARY|CONFIDENCE").expect("valid regex"));
static SUMMARY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SUMMARY?:").expect("valid regex"));
static SUMMARY_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CONFIDENCE|APPLICABLE").expect("valid regex"));
static CONFIDENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:CONFIDENCE|confidence)[\s:]*([0-9.]+)").expect("valid regex"));

/// Sections read from a header-formatted plain-text response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sections {
    pub facts: String,
    pub legal_issues: Vec<String>,
    pub summary: String,
    /// In `[0, 1]`; values above 1 in the text are read as percentages.
    pub confidence: f64,
}

impl Sections {
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.summary.is_empty()
    }
}

/// Read FACTS / LEGAL ISSUES / SUMMARY / CONFIDENCE sections.
///
/// Each section runs from its header to the next known header or the end
/// of the text. Missing sections stay empty.
pub fn extract_sections(response: &str) -> Sections {
    let mut sections = Sections::default();
    if let Some(body) = section(response, &FACTS_HEADER, &FACTS_END) {
        sections.facts = body.trim().to_string();
    }
    if let Some(body) = section(response, &ISSUES_HEADER, &ISSUES_END) {
        sections.legal_issues = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(body) = section(response, &SUMMARY_HEADER, &SUMMARY_END) {
        sections.summary = body.trim().to_string();
    }
    if let Some(caps) = CONFIDENCE.captures(response) {
        let value = caps[1].parse::<f64>().unwrap_or(0.0);
        sections.confidence = normalize_confidence(value);
    }
    sections
}

fn section<'a>(text: &'a str, header: &Regex, end: &Regex) -> Option<&'a str> {
    let start = header.find(text)?.end();
    let rest = &text[start..];
    let stop = end.find(rest).map_or(rest.len(), |m| m.start());
    Some(&rest[..stop])
}

// ── Law references ──

static LAW_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:Section|Sec\.?\s*|IPC\s*|ICA\s*|CrPC\s*)?(\d+[A-Z]*)\s*[,:]?\s*([^,\n]+?(?:Act|Code|Law|Clause)[^,\n]*)",
    )
    .expect("valid regex")
});

/// A section/law pair found in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LawReference {
    pub section: String,
    pub law: String,
    pub relevance: String,
}

/// Find `"<number> <... Act|Code|Law|Clause ...>"` references in free text.
pub fn extract_laws_and_sections(response: &str) -> Vec<LawReference> {
    LAW_REFERENCE
        .captures_iter(response)
        .map(|caps| LawReference {
            section: caps[1].to_string(),
            law: caps[2].trim().to_string(),
            relevance: "Applicable to this case".to_string(),
        })
        .collect()
}
