#![forbid(unsafe_code)]

//! Form-data flattening helpers.
//!
//! Consumes the host form's standard value-collection contract (ordered
//! name/value entries) and produces JSON-shaped maps:
//!
//! - [`form_values`] — flat mapping from field name to value, with repeated
//!   names collected into arrays in submission order.
//! - [`form_values_nested`] — interprets `.` in field names as a path into
//!   nested objects, with repeated leaf names becoming arrays at that path.
//!
//! # Example
//!
//! ```rust
//! use formic_data::{form_values, form_values_nested};
//! use serde_json::json;
//!
//! let flat = form_values([("foo", "1"), ("baz", "1"), ("baz", "2")]);
//! assert_eq!(flat["foo"], json!("1"));
//! assert_eq!(flat["baz"], json!(["1", "2"]));
//!
//! let nested = form_values_nested([("one.a", "a"), ("one.b", "b")]);
//! assert_eq!(nested["one"], json!({"a": "a", "b": "b"}));
//! ```

use serde_json::{Map, Value};

/// Flatten form entries into a map from field name to value.
///
/// A name that appears once maps to its string value; a repeated name maps
/// to an array of every value in submission order.
pub fn form_values<I, K, V>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut map = Map::new();
    for (name, value) in entries {
        insert_leaf(&mut map, name.into(), Value::String(value.into()));
    }
    map
}

/// Flatten form entries into nested objects, splitting names on `.`.
///
/// `"one.a" = "a"` lands at `{"one": {"a": "a"}}`; a repeated leaf name
/// becomes an array at its path. An intermediate segment that already holds
/// a scalar is replaced by an object — structure wins over an earlier leaf.
pub fn form_values_nested<I, K, V>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut root = Map::new();
    for (name, value) in entries {
        let name = name.into();
        let path: Vec<&str> = name.split('.').collect();
        insert_nested(&mut root, &path, Value::String(value.into()));
    }
    root
}

/// Insert a leaf value, promoting an existing scalar to an array on repeat.
fn insert_leaf(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let prior = existing.take();
            *existing = Value::Array(vec![prior, value]);
        }
    }
}

fn insert_nested(map: &mut Map<String, Value>, path: &[&str], value: Value) {
    let [head, rest @ ..] = path else {
        return;
    };
    if rest.is_empty() {
        insert_leaf(map, (*head).to_string(), value);
        return;
    }
    let child = map
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    if let Value::Object(child_map) = child {
        insert_nested(child_map, rest, value);
    }
}
