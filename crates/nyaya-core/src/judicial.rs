//! Judicial analysis returned by the legal-action stage, and its display forms.
//!
//! The analysis is free-form model output. Accessors here read it tolerantly:
//! several alternate key names are accepted and values of the wrong shape are
//! treated as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::evidence::value_as_text;

/// Raw judicial analysis object as parsed from the model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudicialAnalysis(pub Map<String, Value>);

/// Display-friendly form of one recommended action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalSuggestion {
    pub suggested_action: String,
    pub priority: String,
    pub confidence: Option<i64>,
    pub applicable_laws: Vec<String>,
    pub reasoning: String,
    pub risk_factors: Vec<Value>,
    pub next_steps: Vec<Value>,
}

impl JudicialAnalysis {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// `case_strength.overall_verdict_likelihood` as an integer percentage.
    ///
    /// Accepts a number or a string such as `"72%"`; anything unreadable is 0.
    /// The result is clamped to `0..=100`.
    pub fn primary_confidence(&self) -> u32 {
        let likelihood = self
            .0
            .get("case_strength")
            .and_then(|s| s.get("overall_verdict_likelihood"));
        let raw = match likelihood {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.replace('%', "").trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        raw.clamp(0.0, 100.0) as u32
    }

    pub fn applicable_laws(&self) -> &[Value] {
        self.0
            .get("applicable_laws")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn precedent_count(&self) -> usize {
        self.0
            .get("precedent_cases")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// One line per applicable law: `"name — section : relevance"`, with the
    /// section and relevance parts omitted when empty.
    pub fn applicable_laws_display(&self) -> Vec<String> {
        self.applicable_laws()
            .iter()
            .map(|law| match law.as_object() {
                Some(obj) => {
                    let name = first_text(obj, &["law_name", "name"]);
                    let section = first_text(obj, &["section", "section_number"]);
                    let relevance = first_text(obj, &["relevance"]);
                    let mut line = name;
                    if !section.is_empty() {
                        line.push_str(&format!(" — {section}"));
                    }
                    if !relevance.is_empty() {
                        line.push_str(&format!(" : {relevance}"));
                    }
                    line
                }
                None => value_as_text(law).unwrap_or_default(),
            })
            .collect()
    }

    /// Normalized recommended actions.
    ///
    /// Reads `recommended_actions`, then `judicial_recommendations`; only a
    /// list counts. If neither is a list and the analysis itself looks like a
    /// single suggestion, it is wrapped as one.
    pub fn suggestions(&self) -> Vec<LegalSuggestion> {
        let raw = first_truthy(&self.0, &["recommended_actions", "judicial_recommendations"]);
        let single = ["suggested_action", "priority", "confidence"]
            .iter()
            .any(|k| self.0.contains_key(*k));
        match raw {
            Some(Value::Array(items)) => items.iter().map(LegalSuggestion::from_value).collect(),
            None if single => vec![LegalSuggestion::from_map(&self.0)],
            _ => Vec::new(),
        }
    }
}

impl LegalSuggestion {
    pub fn from_value(value: &Value) -> Self {
        match value.as_object() {
            Some(obj) => Self::from_map(obj),
            None => Self {
                suggested_action: value_as_text(value).unwrap_or_default(),
                priority: "Normal".to_string(),
                confidence: None,
                applicable_laws: Vec::new(),
                reasoning: String::new(),
                risk_factors: Vec::new(),
                next_steps: Vec::new(),
            },
        }
    }

    fn from_map(obj: &Map<String, Value>) -> Self {
        let title = first_text(obj, &["suggested_action", "action", "title", "suggestion"]);
        let priority = first_text(obj, &["priority", "priority_level"]);
        Self {
            suggested_action: if title.is_empty() {
                "Suggested Action".to_string()
            } else {
                title
            },
            priority: if priority.is_empty() {
                "Normal".to_string()
            } else {
                priority
            },
            confidence: obj.get("confidence").and_then(confidence_percent),
            applicable_laws: law_lines(first_truthy(obj, &["applicable_laws", "laws"])),
            reasoning: first_text(obj, &["reasoning", "rationale"]),
            risk_factors: list_or_empty(obj.get("risk_factors")),
            next_steps: list_or_empty(obj.get("next_steps")),
        }
    }
}

/// Convert a suggestion confidence to an integer percentage.
///
/// Fractions up to 1.0 are scaled by 100; `"NN%"` strings give NN; other
/// numbers are truncated. Anything else is absent.
pub fn confidence_percent(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_f64() => {
            let f = n.as_f64()?;
            Some(if f <= 1.0 { (f * 100.0) as i64 } else { f as i64 })
        }
        Value::Number(n) => n.as_i64(),
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix('%')?.trim().parse::<i64>().ok()
        }
        _ => None,
    }
}

fn law_lines(laws: Option<&Value>) -> Vec<String> {
    match laws {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|law| match law {
                Value::String(s) => s.clone(),
                Value::Object(obj) => {
                    let name = first_text(obj, &["law_name", "law", "name"]);
                    let section = first_text(obj, &["section", "section_number"]);
                    match (name.is_empty(), section.is_empty()) {
                        (false, false) => format!("{name} — {section}"),
                        (false, true) => name,
                        _ => law.to_string(),
                    }
                }
                other => other.to_string(),
            })
            .collect(),
        Some(other) => vec![value_as_text(other).unwrap_or_default()],
    }
}

fn list_or_empty(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Whether a JSON value would count as "set" in a loosely-typed lookup.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn first_truthy<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| is_truthy(v))
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    first_truthy(obj, keys)
        .and_then(value_as_text)
        .unwrap_or_default()
}
