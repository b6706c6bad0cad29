//! Dotted field paths into documents.
//!
//! A path such as `address.lines.0` names a value nested inside a document:
//! map keys and array positions separated by dots. A backslash escapes the
//! next character, so `a\.b` is the single key `a.b`.

use tidedb_codec::Value;

/// Splits a dotted path into segments.
///
/// Interior empty segments are kept (`a..b` has three segments), a trailing
/// empty segment is dropped (`a.` is just `a`), and a dangling backslash is
/// ignored.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for ch in path.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '.' {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Follows `segments` from `value`.
///
/// Never fails: anything that cannot be followed yields `Value::Null`.
pub fn navigate(value: &Value, segments: &[String]) -> Value {
    let mut current = value;
    for segment in segments {
        current = match current {
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) if index < items.len() => &items[index],
                _ => return Value::Null,
            },
            Value::Map(_) => match current.get(segment) {
                Some(next) => next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current.clone()
}

/// Extracts the value at a dotted `path`.
///
/// ```
/// use tidedb_codec::Value;
/// use tidedb_core::json_path;
///
/// let doc = Value::object([("tags", Value::from(vec!["a".to_string(), "b".to_string()]))]);
/// assert_eq!(json_path(&doc, "tags.1"), Value::from("b"));
/// assert_eq!(json_path(&doc, "tags.7"), Value::Null);
/// ```
pub fn json_path(value: &Value, path: &str) -> Value {
    navigate(value, &split_path(path))
}
