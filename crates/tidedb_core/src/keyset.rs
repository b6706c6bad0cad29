//! Document key sets stored in non-unique index postings.

use crate::error::{CoreError, CoreResult};
use tidedb_codec::Value;

/// An unordered set of document keys.
///
/// Postings rarely hold more than a handful of keys, so a vector with linear
/// lookup is enough. Removal swaps the last key into the hole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<String>,
}

impl KeySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`. Returns `false` if it was already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(pos) => {
                self.keys.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether `key` is in the set.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Borrow the keys in storage order.
    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }

    /// The persisted form: an array of text values.
    pub fn to_value(&self) -> Value {
        Value::Array(self.keys.iter().cloned().map(Value::Text).collect())
    }

    /// Parses the persisted form.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `value` is not an array of text values.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| CoreError::internal("key set is not an array"))?;
        let mut set = Self::new();
        for item in items {
            let key = item
                .as_text()
                .ok_or_else(|| CoreError::internal("key set entry is not text"))?;
            set.insert(key);
        }
        Ok(set)
    }
}

impl From<Vec<String>> for KeySet {
    fn from(keys: Vec<String>) -> Self {
        let mut set = Self::new();
        for key in &keys {
            set.insert(key);
        }
        set
    }
}

impl From<KeySet> for Vec<String> {
    fn from(set: KeySet) -> Self {
        set.keys
    }
}
