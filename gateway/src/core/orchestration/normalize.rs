//! Decoding of orchestration webhook responses.
//!
//! Workflow engines answer in several envelopes depending on how the flow
//! ends. The decode chain below is applied in order:
//!
//! 1. a non-empty list is reduced to its first element
//! 2. a `json` mapping (else a `body` mapping) is unwrapped
//! 3. a `values` group (`{"string": [{name, value}], "boolean": [...], ...}`)
//!    is flattened into one mapping keyed by `name`
//! 4. a mapping is read as a record (`text`/`output`/`response`, `type`,
//!    `crisis_flag`, `meta`)
//! 5. a plain string is the text
//!
//! Anything else is kept as `{raw, parsed}`; bodies that are not JSON at all
//! become `{raw}`. An inline `[[type:<id>]]` tag supplies the type when the
//! record has none.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Inline response-type tag, e.g. `[[type:empathic]]`
pub static TYPE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[type:([a-zA-Z0-9_\-]+)\]\]").expect("static type tag pattern")
});

/// Keys read as the response text, in priority order
const TEXT_KEYS: [&str; 3] = ["text", "output", "response"];

/// Canonical orchestration record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    #[serde(rename = "type")]
    pub response_type: Option<String>,
    pub text: Option<String>,
    pub crisis_flag: Option<bool>,
    pub meta: Option<Map<String, Value>>,
}

impl OrchestrationResult {
    /// Text, if present and not blank
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Normalized record plus the decoded payload it was read from.
///
/// The payload keeps fields outside the canonical four (`subtype`,
/// `method_intent`, ...) and is what diagnostics report as the raw result.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub result: OrchestrationResult,
    pub payload: Value,
}

/// Shape of a decoded response after envelope unwrapping.
#[derive(Debug, Clone, PartialEq)]
enum Envelope {
    /// A mapping, possibly flattened from a `values` group
    Record(Map<String, Value>),
    /// A bare string
    Text(String),
    /// Valid JSON of no recognised shape
    Unexpected(Value),
    /// Not JSON
    Raw,
}

/// Normalize a raw response body.
pub fn normalize_body(body: &str) -> NormalizedResponse {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => normalize_value(value, body),
        Err(_) => build(Envelope::Raw, body),
    }
}

/// Normalize an already decoded response. `raw` is the original body text.
pub fn normalize_value(value: Value, raw: &str) -> NormalizedResponse {
    build(classify(value), raw)
}

fn classify(value: Value) -> Envelope {
    let value = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };

    match value {
        Value::Object(map) => {
            let map = unwrap_envelope(map);
            match flatten_values(&map) {
                Some(flat) => Envelope::Record(flat),
                None => Envelope::Record(map),
            }
        }
        Value::String(text) => Envelope::Text(text),
        other => Envelope::Unexpected(other),
    }
}

fn unwrap_envelope(mut map: Map<String, Value>) -> Map<String, Value> {
    for key in ["json", "body"] {
        if matches!(map.get(key), Some(Value::Object(_))) {
            if let Some(Value::Object(inner)) = map.remove(key) {
                return inner;
            }
        }
    }
    map
}

/// Flatten a `values` group. `None` when absent or empty after flattening.
fn flatten_values(map: &Map<String, Value>) -> Option<Map<String, Value>> {
    let Value::Object(groups) = map.get("values")? else {
        return None;
    };

    let mut flat = Map::new();
    for (value_type, entries) in groups {
        let Value::Array(entries) = entries else {
            continue;
        };
        for entry in entries {
            let Some(name) = entry.get("name").and_then(entry_name) else {
                continue;
            };
            let value = entry.get("value").cloned().unwrap_or(Value::Null);
            let value = match value_type.as_str() {
                "json" => decode_embedded(value),
                "boolean" => Value::Bool(truthy(&value)),
                _ => value,
            };
            flat.insert(name, value);
        }
    }
    (!flat.is_empty()).then_some(flat)
}

fn entry_name(name: &Value) -> Option<String> {
    match name {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// `json`-typed group entries carry their value as JSON text.
fn decode_embedded(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

/// Loose truthiness used by workflow engines for flags.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn build(envelope: Envelope, raw: &str) -> NormalizedResponse {
    let (mut result, payload) = match envelope {
        Envelope::Record(map) => (read_record(&map), Value::Object(map)),
        Envelope::Text(text) => (
            OrchestrationResult {
                text: Some(text.clone()),
                ..Default::default()
            },
            Value::String(text),
        ),
        Envelope::Unexpected(parsed) => (
            OrchestrationResult::default(),
            json!({ "raw": raw, "parsed": parsed }),
        ),
        Envelope::Raw => (OrchestrationResult::default(), json!({ "raw": raw })),
    };

    apply_type_tag(&mut result);
    NormalizedResponse { result, payload }
}

fn read_record(map: &Map<String, Value>) -> OrchestrationResult {
    let text = TEXT_KEYS.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    });

    let response_type = match map.get("type") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    };

    let crisis_flag = match map.get("crisis_flag") {
        None | Some(Value::Null) => None,
        Some(value) => Some(truthy(value)),
    };

    let meta = match map.get("meta") {
        Some(Value::Object(meta)) => Some(meta.clone()),
        _ => None,
    };

    OrchestrationResult {
        response_type,
        text,
        crisis_flag,
        meta,
    }
}

/// Move an inline type tag into `response_type` when no explicit type was given.
fn apply_type_tag(result: &mut OrchestrationResult) {
    if result.response_type.is_some() {
        return;
    }
    let Some(text) = result.text.as_deref() else {
        return;
    };
    let Some(captures) = TYPE_TAG.captures(text) else {
        return;
    };
    let (Some(tag), Some(name)) = (captures.get(0), captures.get(1)) else {
        return;
    };

    let stripped = format!("{}{}", &text[..tag.start()], &text[tag.end()..]);
    result.response_type = Some(name.as_str().to_string());
    result.text = Some(stripped.trim().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_of(value: Value) -> OrchestrationResult {
        let raw = value.to_string();
        normalize_body(&raw).result
    }

    #[test]
    fn test_flat_mapping() {
        let result = result_of(json!({
            "type": "neutral",
            "text": "Hai! **Apa kabar**",
            "crisis_flag": false,
            "meta": {"lang": "id"}
        }));
        assert_eq!(result.response_type.as_deref(), Some("neutral"));
        assert_eq!(result.text.as_deref(), Some("Hai! **Apa kabar**"));
        assert_eq!(result.crisis_flag, Some(false));
        assert_eq!(result.meta.unwrap()["lang"], "id");
    }

    #[test]
    fn test_list_of_json_envelopes() {
        let normalized = normalize_body(
            &json!([
                {"json": {"type": "crisis", "text": "", "crisis_flag": true, "subtype": "hard_block"}},
                {"json": {"type": "neutral", "text": "ignored"}}
            ])
            .to_string(),
        );
        assert_eq!(normalized.result.response_type.as_deref(), Some("crisis"));
        assert_eq!(normalized.result.text, None);
        assert_eq!(normalized.result.crisis_flag, Some(true));
        assert_eq!(normalized.payload["subtype"], "hard_block");
    }

    #[test]
    fn test_body_envelope() {
        let result = result_of(json!({"body": {"output": "Halo", "type": "empathic"}}));
        assert_eq!(result.text.as_deref(), Some("Halo"));
        assert_eq!(result.response_type.as_deref(), Some("empathic"));
    }

    #[test]
    fn test_json_envelope_wins_over_body() {
        let result = result_of(json!({"json": {"text": "from json"}, "body": {"text": "from body"}}));
        assert_eq!(result.text.as_deref(), Some("from json"));
    }

    #[test]
    fn test_list_element_without_envelope() {
        let result = result_of(json!([{"response": "Halo juga"}]));
        assert_eq!(result.text.as_deref(), Some("Halo juga"));
    }

    #[test]
    fn test_values_group_is_flattened() {
        let normalized = normalize_body(
            &json!({
                "keepOnlySet": true,
                "values": {
                    "string": [{"name": "text", "value": "Tenang ya"}, {"name": "type", "value": "empathic"}],
                    "boolean": [{"name": "crisis_flag", "value": ""}, {"name": "method_intent", "value": 1}],
                    "json": [{"name": "meta", "value": "{\"score\": 3}"}, {"name": "bad", "value": "{not json"}]
                }
            })
            .to_string(),
        );
        let result = normalized.result;
        assert_eq!(result.text.as_deref(), Some("Tenang ya"));
        assert_eq!(result.response_type.as_deref(), Some("empathic"));
        assert_eq!(result.crisis_flag, Some(false));
        assert_eq!(result.meta.unwrap()["score"], 3);
        assert_eq!(normalized.payload["method_intent"], true);
        assert_eq!(normalized.payload["bad"], "{not json");
        assert!(normalized.payload.get("keepOnlySet").is_none());
    }

    #[test]
    fn test_empty_values_group_falls_back_to_mapping() {
        let result = result_of(json!({"values": {"string": []}, "text": "still here"}));
        assert_eq!(result.text.as_deref(), Some("still here"));
    }

    #[test]
    fn test_text_priority() {
        let result = result_of(json!({"output": "second", "response": "third", "text": "first"}));
        assert_eq!(result.text.as_deref(), Some("first"));

        let result = result_of(json!({"text": "", "output": "second"}));
        assert_eq!(result.text.as_deref(), Some("second"));
    }

    #[test]
    fn test_non_mapping_meta_is_dropped() {
        let result = result_of(json!({"text": "x", "meta": "{\"a\":1}"}));
        assert_eq!(result.meta, None);
    }

    #[test]
    fn test_plain_string() {
        let result = result_of(json!("Halo dari flow"));
        assert_eq!(result.text.as_deref(), Some("Halo dari flow"));
        assert_eq!(result.response_type, None);
        assert_eq!(result.crisis_flag, None);
        assert_eq!(result.meta, None);
    }

    #[test]
    fn test_non_json_body_is_kept_raw() {
        let normalized = normalize_body("Workflow was started");
        assert_eq!(normalized.result, OrchestrationResult::default());
        assert_eq!(normalized.payload, json!({"raw": "Workflow was started"}));
    }

    #[test]
    fn test_unexpected_shape_is_kept_with_parsed_value() {
        let normalized = normalize_body("42");
        assert_eq!(normalized.result, OrchestrationResult::default());
        assert_eq!(normalized.payload, json!({"raw": "42", "parsed": 42}));

        let normalized = normalize_body("[]");
        assert_eq!(normalized.payload, json!({"raw": "[]", "parsed": []}));
    }

    #[test]
    fn test_inline_type_tag() {
        let result = result_of(json!({"text": "[[type:alert]] Hati-hati di jalan [[type:neutral]]"}));
        assert_eq!(result.response_type.as_deref(), Some("alert"));
        assert_eq!(result.text.as_deref(), Some("Hati-hati di jalan [[type:neutral]]"));
    }

    #[test]
    fn test_inline_tag_ignored_when_type_present() {
        let result = result_of(json!({"type": "neutral", "text": "[[type:alert]] Halo"}));
        assert_eq!(result.response_type.as_deref(), Some("neutral"));
        assert_eq!(result.text.as_deref(), Some("[[type:alert]] Halo"));
    }

    #[test]
    fn test_inline_tag_in_plain_string() {
        let result = result_of(json!("Halo [[type:empathic]]"));
        assert_eq!(result.response_type.as_deref(), Some("empathic"));
        assert_eq!(result.text.as_deref(), Some("Halo"));
    }

    #[test]
    fn test_serializes_with_type_key() {
        let value = serde_json::to_value(OrchestrationResult {
            response_type: Some("chat".to_string()),
            text: Some("Halo".to_string()),
            crisis_flag: None,
            meta: None,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "chat", "text": "Halo", "crisis_flag": null, "meta": null})
        );
    }
}
