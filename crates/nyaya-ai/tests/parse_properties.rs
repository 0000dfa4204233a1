//! Property tests for response repair.
//!
//! 1. `parse_json` is total: any input yields a map, never a panic
//! 2. A fenced JSON object survives surrounding prose
//! 3. Python-style literals recover the same object as strict JSON

use nyaya_ai::parse::{extract_sections, parse_json};
use proptest::prelude::*;
use serde_json::{Map, Value};

// ── Strategies ──

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,12}"
}

/// Strings without quotes or backslashes so they render the same in both
/// JSON and Python literal syntax.
fn plain_text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,:;()-]{0,40}"
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        plain_text_strategy().prop_map(Value::String),
        (-10_000i64..10_000).prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        Just(Value::Null),
    ]
}

fn object_strategy() -> impl Strategy<Value = Map<String, Value>> {
    let value = prop_oneof![
        3 => leaf_strategy(),
        1 => prop::collection::vec(leaf_strategy(), 0..4).prop_map(Value::Array),
    ];
    prop::collection::btree_map(key_strategy(), value, 0..6)
        .prop_map(|m| m.into_iter().collect())
}

/// Prose that cannot open an object of its own.
fn prose_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z ,.!\n]{0,60}"
}

fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{k}': {}", python_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

// ── Properties ──

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn parse_json_is_total(input in any::<String>()) {
        let _ = parse_json(&input);
        let _ = extract_sections(&input);
    }

    #[test]
    fn parse_json_survives_brace_soup(input in "[{}\\[\\]\"':,a-z0-9 \n/*`]{0,200}") {
        let _ = parse_json(&input);
    }

    #[test]
    fn fenced_object_round_trips(
        object in object_strategy(),
        before in prose_strategy(),
        after in prose_strategy(),
    ) {
        let json = serde_json::to_string_pretty(&Value::Object(object.clone())).unwrap();
        let response = format!("{before}\n```json\n{json}\n```\n{after}");
        prop_assert_eq!(parse_json(&response), object);
    }

    #[test]
    fn python_literal_matches_json(object in object_strategy()) {
        let literal = python_literal(&Value::Object(object.clone()));
        prop_assert_eq!(parse_json(&literal), object);
    }
}

#[test]
fn trailing_commas_and_comments() {
    let response = r#"Here is the analysis:
{
  // model commentary
  "facts": ["Sale agreed", "Goods unpaid",],
  /* block */ "summary": "Unpaid goods",
}"#;
    let parsed = parse_json(response);
    assert_eq!(parsed["summary"], "Unpaid goods");
    assert_eq!(parsed["facts"].as_array().map(Vec::len), Some(2));
}
