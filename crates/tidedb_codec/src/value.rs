//! Dynamic document value.

use crate::encoder::to_canonical_cbor;

/// A JSON-like value, plus byte strings.
///
/// Documents, index query values and index exclusions are all `Value`s.
/// `Map` entries are kept in canonical order (see [`Value::map`]) so that two
/// maps with the same entries compare equal whichever way they were built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null, also the value of anything missing.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// Finite double.
    Float(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Key/value entries.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a map, ordering entries by the canonical encoding of their
    /// keys.
    pub fn map(mut entries: Vec<(Value, Value)>) -> Self {
        entries.sort_by_cached_key(|(key, _)| to_canonical_cbor(key).unwrap_or_default());
        Value::Map(entries)
    }

    /// Builds a text-keyed map, the shape of a JSON object.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v.into()))
                .collect(),
        )
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }

    /// The bytes, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The text, if this is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The items, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a text key. Anything but a map has no keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let Value::Map(entries) = self else {
            return None;
        };
        entries
            .iter()
            .find_map(|(k, v)| (k.as_text() == Some(key)).then_some(v))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::Array(items.into_iter().map(Value::Text).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(value: &Value) -> Vec<&str> {
        match value {
            Value::Map(entries) => entries.iter().filter_map(|(k, _)| k.as_text()).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn object_orders_keys_by_encoding() {
        // shorter text heads sort first, then bytewise
        let obj = Value::object([("zz", 1), ("b", 2), ("a", 3), ("ab", 4)]);
        assert_eq!(keys(&obj), ["a", "b", "ab", "zz"]);
    }

    #[test]
    fn construction_order_does_not_matter() {
        let one = Value::object([("x", 1), ("y", 2)]);
        let two = Value::object([("y", 2), ("x", 1)]);
        assert_eq!(one, two);
    }

    #[test]
    fn get_only_on_maps() {
        let obj = Value::object([("name", "Alice")]);
        assert_eq!(obj.get("name"), Some(&Value::from("Alice")));
        assert_eq!(obj.get("age"), None);
        assert_eq!(Value::Array(vec![Value::Null]).get("0"), None);

        let int_keyed = Value::map(vec![(Value::Integer(1), Value::Null)]);
        assert_eq!(int_keyed.get("1"), None);
    }

    #[test]
    fn accessors() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::Float(7.0).as_integer(), None);
        assert_eq!(Value::Bytes(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert_eq!(Value::from("t").as_text(), Some("t"));
        assert_eq!(Value::from(vec![Value::Null]).as_array().map(<[Value]>::len), Some(1));
        assert_eq!(Value::Text("x".into()).as_array(), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(3u32), Value::Integer(3));
        assert_eq!(Value::from(-3i32), Value::Integer(-3));
        assert_eq!(Value::from(Some("a")), Value::from("a"));
        assert_eq!(Value::from(None::<bool>), Value::Null);
        assert_eq!(
            Value::from(vec!["k".to_string()]),
            Value::Array(vec![Value::from("k")])
        );
    }
}
