//! Small shared helpers

use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize a value and unwrap the resulting JSON object.
pub(crate) fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(obj) => Ok(obj),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Rename the top-level keys of a JSON object according to a
/// long-name -> short-alias table. Keys missing from the table
/// (retained unknown upstream keys included) pass through untouched.
pub(crate) fn remap_keys(obj: Map<String, Value>, table: &[(&str, &str)]) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in obj {
        let key = table
            .iter()
            .find(|(long, _)| *long == key)
            .map(|(_, short)| (*short).to_string())
            .unwrap_or(key);
        out.insert(key, value);
    }
    out
}

/// Non-empty trailing path segment of a URL, if any.
pub(crate) fn last_path_segment(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_path_segment() {
        assert_eq!(
            last_path_segment("https://example.com/en/view/abc123"),
            Some("abc123")
        );
        assert_eq!(last_path_segment("https://example.com/en/view/"), None);
        assert_eq!(last_path_segment(""), None);
    }

    #[test]
    fn test_remap_keys_passes_unknown_through() {
        let mut obj = Map::new();
        obj.insert("known".to_string(), Value::from(1));
        obj.insert("unknown".to_string(), Value::from(2));
        let out = remap_keys(obj, &[("known", "k")]);
        assert_eq!(out.get("k"), Some(&Value::from(1)));
        assert_eq!(out.get("unknown"), Some(&Value::from(2)));
    }
}
