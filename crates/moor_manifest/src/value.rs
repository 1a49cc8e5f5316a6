//! Field access helpers over raw document values.
//!
//! Manifest sections are heterogeneous YAML mappings; these helpers do the
//! shape dispatch once so section loaders read declaratively.

use serde_yaml::Value;

/// Look up a field in a mapping-shaped value.
pub(crate) fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.as_mapping()?.get(Value::String(key.to_string()))
}

/// String field, or `None` when absent or not a string.
pub(crate) fn str_field(body: &Value, key: &str) -> Option<String> {
    field(body, key)?.as_str().map(ToString::to_string)
}

/// String field defaulting to the empty string (absent and `null` included).
pub(crate) fn str_field_or_empty(body: &Value, key: &str) -> String {
    str_field(body, key).unwrap_or_default()
}

/// Integer field with a default.
pub(crate) fn int_field(body: &Value, key: &str, default: i64) -> i64 {
    field(body, key).and_then(Value::as_i64).unwrap_or(default)
}

/// Boolean field with a default.
pub(crate) fn bool_field(body: &Value, key: &str, default: bool) -> bool {
    field(body, key).and_then(Value::as_bool).unwrap_or(default)
}

/// List-of-strings field; absent, `null`, and non-list values yield an
/// empty list, scalar items are stringified.
pub(crate) fn string_list(body: &Value, key: &str) -> Vec<String> {
    field(body, key).map(string_seq).unwrap_or_default()
}

/// Stringify the items of a sequence value; non-sequence yields empty.
pub(crate) fn string_seq(value: &Value) -> Vec<String> {
    value
        .as_sequence()
        .map(|seq| seq.iter().filter_map(scalar_string).collect())
        .unwrap_or_default()
}

/// Render a scalar value as a string the way the document author wrote it.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// True when the field is present and truthy in the document sense:
/// not `null`, `false`, `0`, `""`, an empty list, or an empty mapping.
pub(crate) fn truthy_field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    field(body, key).filter(|v| is_truthy(v))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(t) => is_truthy(&t.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_field_lookup() {
        let v = body("cmd: run\ncpu: 2");
        assert_eq!(str_field(&v, "cmd").as_deref(), Some("run"));
        assert_eq!(int_field(&v, "cpu", 0), 2);
        assert_eq!(int_field(&v, "memory", 7), 7);
    }

    #[test]
    fn test_string_list() {
        let v = body("env: [A=1, B=2]");
        assert_eq!(string_list(&v, "env"), vec!["A=1", "B=2"]);
        assert!(string_list(&v, "logs").is_empty());
    }

    #[test]
    fn test_truthiness() {
        let v = body("a: []\nb: 0\nc: [1]\nd: ''\ne: x");
        assert!(truthy_field(&v, "a").is_none());
        assert!(truthy_field(&v, "b").is_none());
        assert!(truthy_field(&v, "c").is_some());
        assert!(truthy_field(&v, "d").is_none());
        assert!(truthy_field(&v, "e").is_some());
        assert!(truthy_field(&v, "missing").is_none());
    }
}
