//! Answer normalization.
//!
//! Stored answers arrive as native JSON values or as text that may itself
//! hold JSON. Everything downstream works on [`AnswerValue`], and this module
//! is the only place that produces it.

use serde_json::Value;

/// Canonical shape of a single answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// A single textual value
    Scalar(String),
    /// A single numeric value
    Numeric(f64),
    /// An ordered list of option labels
    Sequence(Vec<String>),
}

impl AnswerValue {
    /// Label used when counting this value as a single option.
    pub fn label(&self) -> Option<String> {
        match self {
            AnswerValue::Scalar(s) => Some(s.clone()),
            AnswerValue::Numeric(n) => Some(number_label(*n)),
            AnswerValue::Sequence(_) => None,
        }
    }
}

/// Decode answer text as JSON.
///
/// A decode error means the text was plain text, not that it is corrupt.
pub fn decode_text(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// Normalize one raw stored answer.
///
/// Returns `None` for a stored `null`, which is an answer that carries no value.
pub fn normalize(raw: &Value) -> Option<AnswerValue> {
    match raw {
        Value::String(text) => match decode_text(text) {
            Ok(decoded) => from_value(&decoded),
            Err(_) => Some(AnswerValue::Scalar(text.clone())),
        },
        other => from_value(other),
    }
}

/// Normalize every answer in a list, keeping absent entries in place.
pub fn normalize_all(raw: &[Value]) -> Vec<Option<AnswerValue>> {
    raw.iter().map(normalize).collect()
}

/// Decode JSON-in-text for display, leaving anything else untouched.
pub fn display_value(raw: &Value) -> Value {
    match raw {
        Value::String(text) => decode_text(text).unwrap_or_else(|_| raw.clone()),
        other => other.clone(),
    }
}

/// Canonical string form of a number: `4` rather than `4.0`.
///
/// Magnitudes below 1e-6 or from 1e21 up use exponent form (`1e-7`,
/// `1e+21`) so labels match the ones the web frontend produces.
pub fn number_label(n: f64) -> String {
    if n == 0.0 {
        // also folds -0.0
        return "0".to_string();
    }

    if (1e-6..1e21).contains(&n.abs()) {
        return n.to_string();
    }

    let formatted = format!("{:e}", n);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}

fn from_value(value: &Value) -> Option<AnswerValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(AnswerValue::Scalar(s.clone())),
        Value::Number(n) => match n.as_f64() {
            Some(f) => Some(AnswerValue::Numeric(f)),
            None => Some(AnswerValue::Scalar(n.to_string())),
        },
        Value::Bool(b) => Some(AnswerValue::Scalar(b.to_string())),
        Value::Array(items) => Some(AnswerValue::Sequence(
            items.iter().filter_map(element_label).collect(),
        )),
        Value::Object(_) => Some(AnswerValue::Scalar(value.to_string())),
    }
}

fn element_label(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.as_f64().map(number_label).unwrap_or_else(|| n.to_string())),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_text_array_becomes_sequence() {
        let raw = Value::String("[\"x\",\"y\"]".to_string());
        assert_eq!(
            normalize(&raw),
            Some(AnswerValue::Sequence(vec!["x".to_string(), "y".to_string()]))
        );
    }

    #[test]
    fn test_plain_text_falls_back_to_scalar() {
        let raw = Value::String("plain".to_string());
        assert_eq!(normalize(&raw), Some(AnswerValue::Scalar("plain".to_string())));
    }

    #[test]
    fn test_numeric_text_decodes_to_number() {
        assert_eq!(normalize(&json!("4")), Some(AnswerValue::Numeric(4.0)));
        assert_eq!(normalize(&json!("4.5")), Some(AnswerValue::Numeric(4.5)));
    }

    #[test]
    fn test_quoted_text_decodes_once() {
        assert_eq!(
            normalize(&json!("\"Red\"")),
            Some(AnswerValue::Scalar("Red".to_string()))
        );
        assert_eq!(
            normalize(&json!("\"4\"")),
            Some(AnswerValue::Scalar("4".to_string()))
        );
    }

    #[test]
    fn test_native_values_pass_through() {
        assert_eq!(normalize(&json!(3)), Some(AnswerValue::Numeric(3.0)));
        assert_eq!(
            normalize(&json!(["A", "B"])),
            Some(AnswerValue::Sequence(vec!["A".to_string(), "B".to_string()]))
        );
        assert_eq!(normalize(&json!(true)), Some(AnswerValue::Scalar("true".to_string())));
    }

    #[test]
    fn test_null_is_absent() {
        assert_eq!(normalize(&Value::Null), None);
        assert_eq!(normalize(&json!("null")), None);
    }

    #[test]
    fn test_sequence_elements() {
        let raw = json!(["A", null, 2, 2.5, false, ""]);
        assert_eq!(
            normalize(&raw),
            Some(AnswerValue::Sequence(vec![
                "A".to_string(),
                "2".to_string(),
                "2.5".to_string(),
                "false".to_string(),
                "".to_string(),
            ]))
        );
    }

    #[test]
    fn test_object_becomes_json_label() {
        assert_eq!(
            normalize(&json!({"k": 1})),
            Some(AnswerValue::Scalar("{\"k\":1}".to_string()))
        );
    }

    #[test]
    fn test_number_label() {
        assert_eq!(number_label(4.0), "4");
        assert_eq!(number_label(4.5), "4.5");
        assert_eq!(number_label(-0.0), "0");
        assert_eq!(number_label(-2.0), "-2");
    }

    #[test]
    fn test_number_label_extreme_magnitudes() {
        assert_eq!(number_label(1e21), "1e+21");
        assert_eq!(number_label(-1e21), "-1e+21");
        assert_eq!(number_label(1.23e22), "1.23e+22");
        assert_eq!(number_label(1e-7), "1e-7");
        assert_eq!(number_label(1.5e-7), "1.5e-7");
        assert_eq!(number_label(1e-6), "0.000001");
        assert_eq!(number_label(1e20), "100000000000000000000");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("[1,2]")), json!([1, 2]));
        assert_eq!(display_value(&json!("hello world")), json!("hello world"));
        assert_eq!(display_value(&json!(5)), json!(5));
    }

    #[test]
    fn test_normalize_all_keeps_positions() {
        let raw = vec![json!("a"), Value::Null, json!(1)];
        let normalized = normalize_all(&raw);
        assert_eq!(normalized.len(), 3);
        assert!(normalized[1].is_none());
    }
}
