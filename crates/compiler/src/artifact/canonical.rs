//! Canonical JSON: object keys sorted, array order kept, no insignificant
//! whitespace in compact form. Identical values always produce identical
//! bytes, whatever the map ordering of the input.

use serde::Serialize;
use serde_json::Value;

/// Compact canonical form, used as hash input
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, None, 0);
    out
}

/// Indented canonical form with a trailing newline, used for files on disk
pub fn to_canonical_pretty(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, Some(2), 0);
    out.push('\n');
    out
}

/// Serialize any value, then canonicalize it
pub fn canonical_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(to_canonical_string(&serde_json::to_value(value)?))
}

fn newline(out: &mut String, indent: Option<usize>, level: usize) {
    if let Some(width) = indent {
        out.push('\n');
        out.extend(std::iter::repeat(' ').take(width * level));
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json string escaping is already canonical
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        Err(_) => out.push_str("\"\""),
    }
}

fn write_value(out: &mut String, value: &Value, indent: Option<usize>, level: usize) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => out.push_str(&value.to_string()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, indent, level + 1);
                write_value(out, item, indent, level + 1);
            }
            newline(out, indent, level);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline(out, indent, level + 1);
                write_string(out, key);
                out.push(':');
                if indent.is_some() {
                    out.push(' ');
                }
                write_value(out, &map[key], indent, level + 1);
            }
            newline(out, indent, level);
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_arrays_kept() {
        let value = json!({ "b": [3, 1, 2], "a": { "z": true, "y": null } });
        assert_eq!(
            to_canonical_string(&value),
            r#"{"a":{"y":null,"z":true},"b":[3,1,2]}"#
        );
    }

    #[test]
    fn test_pretty_form() {
        let value = json!({ "b": [], "a": [1, "x\"y"] });
        assert_eq!(
            to_canonical_pretty(&value),
            "{\n  \"a\": [\n    1,\n    \"x\\\"y\"\n  ],\n  \"b\": []\n}\n"
        );
    }

    #[test]
    fn test_serialize_struct() {
        #[derive(Serialize)]
        struct Sample {
            second: u32,
            first: &'static str,
        }
        let s = canonical_string(&Sample { second: 2, first: "one" }).unwrap();
        assert_eq!(s, r#"{"first":"one","second":2}"#);
    }
}
