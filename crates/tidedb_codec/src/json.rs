//! Conversion between [`Value`] and `serde_json::Value`.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde_json::{Map, Number};

impl Value {
    /// Convert a JSON value.
    ///
    /// Numbers that fit in an `i64` become integers, everything else becomes
    /// a float. Object keys keep their text form.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::map(
                fields
                    .into_iter()
                    .map(|(k, v)| (Value::Text(k), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this value to JSON.
    ///
    /// Byte strings become arrays of small integers.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite floats and for maps with non-text keys.
    pub fn to_json(&self) -> CodecResult<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(n) => serde_json::Value::Number(Number::from(*n)),
            Value::Float(f) => serde_json::Value::Number(
                Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat)?,
            ),
            Value::Bytes(bytes) => serde_json::Value::Array(
                bytes
                    .iter()
                    .map(|b| serde_json::Value::Number(Number::from(*b)))
                    .collect(),
            ),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<CodecResult<Vec<_>>>()?,
            ),
            Value::Map(pairs) => {
                let mut fields = Map::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = key.as_text().ok_or(CodecError::NonTextKey)?;
                    fields.insert(key.to_string(), value.to_json()?);
                }
                serde_json::Value::Object(fields)
            }
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}
