use serde_json::Value;

use crate::error::ExtractError;

/// Recover the JSON object embedded in free-form model output.
///
/// Takes everything from the first `{` to the last `}` and parses it, so prose
/// or code fences around the object are ignored.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ExtractError::NoObject);
    };
    if end < start {
        return Err(ExtractError::NoObject);
    }

    let value: Value = serde_json::from_str(&text[start..=end])?;
    if !value.is_object() {
        return Err(ExtractError::NotAnObject);
    }
    Ok(value)
}

/// Python-style truthiness for JSON values produced by the model.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let raw = "Sure! Here is the analysis:\n```json\n{\"visualization_opportunities\": [{\"content\": \"x\"}]}\n```\nHope it helps.";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["visualization_opportunities"][0]["content"], "x");
    }

    #[test]
    fn spans_nested_objects_to_the_last_brace() {
        let raw = "prefix {\"a\": {\"b\": 1}} suffix";
        assert_eq!(extract_json_object(raw).unwrap(), json!({"a": {"b": 1}}));
    }

    #[test]
    fn reports_missing_delimiters() {
        assert!(matches!(
            extract_json_object("no json here"),
            Err(ExtractError::NoObject)
        ));
        assert!(matches!(
            extract_json_object("} backwards {"),
            Err(ExtractError::NoObject)
        ));
    }

    #[test]
    fn reports_malformed_json() {
        assert!(matches!(
            extract_json_object("{not: valid}"),
            Err(ExtractError::Malformed(_))
        ));
    }

    #[test]
    fn truthiness_matches_model_expectations() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!({}))));
        assert!(!is_truthy(Some(&json!([]))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!({"labels": []}))));
        assert!(is_truthy(Some(&json!([1]))));
    }
}
