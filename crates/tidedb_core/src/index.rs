//! Secondary indexes over document fields.
//!
//! An index maps the canonical encoding of the value found at a field path
//! to the key(s) of the documents holding that value:
//!
//! - A **unique** index posts exactly one document key per value and rejects
//!   a second document with an equal value.
//! - A **non-unique** index posts a [`KeySet`].
//!
//! Values listed in the index's exclusions are never posted. Every posting
//! change produces an [`IndexEvent`] that the store publishes to the index's
//! watchers once the transaction has committed.

use crate::error::{CoreError, CoreResult};
use crate::keyset::KeySet;
use crate::layout;
use crate::path::{navigate, split_path};
use tidedb_codec::{from_cbor, to_canonical_cbor, Value};
use tidedb_storage::{KvRead, WriteTxn};

/// Options chosen when an index is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexConfig {
    /// At most one document per value.
    pub unique: bool,
    /// Values that are never posted.
    pub exclude: Vec<Value>,
}

impl IndexConfig {
    /// A non-unique index with no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets uniqueness.
    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Adds a value that must never be posted.
    #[must_use]
    pub fn exclude(mut self, value: impl Into<Value>) -> Self {
        self.exclude.push(value.into());
        self
    }
}

/// A posting change waiting to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEvent {
    /// Index that changed.
    pub index: String,
    /// Topic key of the affected value.
    pub topic: String,
    /// Keys now posted under the value.
    pub keys: Vec<String>,
}

/// Topic key under which watchers of an encoded index value register.
pub fn value_topic(encoded: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut topic = String::with_capacity(encoded.len() * 2);
    for byte in encoded {
        let _ = write!(topic, "{byte:02x}");
    }
    topic
}

/// A persisted index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    name: String,
    path: Vec<String>,
    unique: bool,
    exclude: Vec<Vec<u8>>,
}

impl IndexDefinition {
    /// Builds a definition. The name doubles as the dotted field path.
    ///
    /// # Errors
    ///
    /// Returns a codec error if an exclusion value cannot be encoded.
    pub fn new(name: &str, config: &IndexConfig) -> CoreResult<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(to_canonical_cbor)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            path: split_path(name),
            unique: config.unique,
            exclude,
        })
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed field path.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Whether the index is unique.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Encoded exclusion values.
    pub fn exclusions(&self) -> &[Vec<u8>] {
        &self.exclude
    }

    /// Encoded value `data` contributes to this index, or `None` when the
    /// value is excluded.
    fn posting_value(&self, data: &Value) -> CoreResult<Option<Vec<u8>>> {
        let encoded = to_canonical_cbor(&navigate(data, &self.path))?;
        if self.exclude.iter().any(|e| *e == encoded) {
            return Ok(None);
        }
        Ok(Some(encoded))
    }

    fn event(&self, encoded: &[u8], keys: Vec<String>) -> IndexEvent {
        IndexEvent {
            index: self.name.clone(),
            topic: value_topic(encoded),
            keys,
        }
    }

    /// Posts `key` under the value `data` holds at this index's path.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UniqueIndexOverlap`] if this is a unique index
    /// and another document already holds the value. Nothing is written in
    /// that case.
    pub fn set(
        &self,
        txn: &mut WriteTxn,
        collection: &str,
        key: &str,
        data: &Value,
        events: &mut Vec<IndexEvent>,
    ) -> CoreResult<()> {
        let Some(encoded) = self.posting_value(data)? else {
            return Ok(());
        };
        let container = layout::index(collection, &self.name);

        if self.unique {
            if let Some(existing) = txn.get(&container, &encoded)? {
                if existing != key.as_bytes() {
                    return Err(CoreError::UniqueIndexOverlap {
                        collection: collection.to_string(),
                        index: self.name.clone(),
                        existing_key: String::from_utf8_lossy(&existing).into_owned(),
                    });
                }
            }
            txn.put(&container, &encoded, key.as_bytes())?;
            events.push(self.event(&encoded, vec![key.to_string()]));
            return Ok(());
        }

        let mut keys = load_key_set(&*txn, &container, &encoded)?;
        keys.insert(key);
        txn.put(&container, &encoded, &to_canonical_cbor(&keys.to_value())?)?;
        events.push(self.event(&encoded, keys.into()));
        Ok(())
    }

    /// Removes `key` from the posting of the value `data` holds at this
    /// index's path.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or a posting cannot be decoded.
    pub fn clear(
        &self,
        txn: &mut WriteTxn,
        collection: &str,
        key: &str,
        data: &Value,
        events: &mut Vec<IndexEvent>,
    ) -> CoreResult<()> {
        let Some(encoded) = self.posting_value(data)? else {
            return Ok(());
        };
        let container = layout::index(collection, &self.name);

        if self.unique {
            txn.delete(&container, &encoded)?;
            events.push(self.event(&encoded, Vec::new()));
            return Ok(());
        }

        let mut keys = load_key_set(&*txn, &container, &encoded)?;
        keys.remove(key);
        if keys.is_empty() {
            txn.delete(&container, &encoded)?;
            events.push(self.event(&encoded, Vec::new()));
        } else {
            txn.put(&container, &encoded, &to_canonical_cbor(&keys.to_value())?)?;
            events.push(self.event(&encoded, keys.into()));
        }
        Ok(())
    }

    /// Keys of the documents posted under `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or a posting cannot be decoded.
    pub fn get(&self, txn: &impl KvRead, collection: &str, value: &Value) -> CoreResult<Vec<String>> {
        let encoded = to_canonical_cbor(value)?;
        self.get_encoded(txn, collection, &encoded)
    }

    pub(crate) fn get_encoded(
        &self,
        txn: &impl KvRead,
        collection: &str,
        encoded: &[u8],
    ) -> CoreResult<Vec<String>> {
        let container = layout::index(collection, &self.name);
        if self.unique {
            return match txn.get(&container, encoded)? {
                Some(key) => Ok(vec![decode_key(key)?]),
                None => Ok(Vec::new()),
            };
        }
        Ok(load_key_set(txn, &container, encoded)?.into())
    }

    fn to_value(&self) -> Value {
        Value::object([
            ("name", Value::from(self.name.as_str())),
            ("unique", Value::Bool(self.unique)),
            (
                "exclude",
                Value::Array(self.exclude.iter().cloned().map(Value::Bytes).collect()),
            ),
        ])
    }

    fn from_value(value: &Value) -> CoreResult<Self> {
        let name = value
            .get("name")
            .and_then(Value::as_text)
            .ok_or_else(|| CoreError::internal("index definition without a name"))?;
        let unique = value
            .get("unique")
            .and_then(Value::as_bool)
            .ok_or_else(|| CoreError::internal(format!("index {name} without a unique flag")))?;
        let exclude = match value.get("exclude") {
            None => Vec::new(),
            Some(list) => list
                .as_array()
                .ok_or_else(|| CoreError::internal(format!("index {name} exclusions malformed")))?
                .iter()
                .map(|e| {
                    e.as_bytes().map(<[u8]>::to_vec).ok_or_else(|| {
                        CoreError::internal(format!("index {name} exclusion is not bytes"))
                    })
                })
                .collect::<CoreResult<Vec<_>>>()?,
        };
        Ok(Self {
            name: name.to_string(),
            path: split_path(name),
            unique,
            exclude,
        })
    }
}

/// The persisted index configuration of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionConfig {
    indexes: Vec<IndexDefinition>,
}

impl CollectionConfig {
    /// Index definitions in persisted order.
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Looks up an index by name.
    pub fn find(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Appends a definition.
    pub fn push(&mut self, definition: IndexDefinition) {
        self.indexes.push(definition);
    }

    /// Removes the named index, moving the last definition into its slot.
    /// Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.indexes.iter().position(|i| i.name == name) {
            Some(pos) => {
                self.indexes.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Encodes the config record.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let value = Value::object([(
            "indexes",
            Value::Array(self.indexes.iter().map(IndexDefinition::to_value).collect()),
        )]);
        Ok(to_canonical_cbor(&value)?)
    }

    /// Decodes a config record.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid config record.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        let value = from_cbor(bytes)?;
        let indexes = match value.get("indexes") {
            None => Vec::new(),
            Some(list) => list
                .as_array()
                .ok_or_else(|| CoreError::internal("config indexes is not an array"))?
                .iter()
                .map(IndexDefinition::from_value)
                .collect::<CoreResult<Vec<_>>>()?,
        };
        Ok(Self { indexes })
    }

    /// Reads the persisted config of `collection`; absent means empty.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the record is malformed.
    pub fn load(txn: &impl KvRead, collection: &str) -> CoreResult<Self> {
        match txn.get(&layout::collection(collection), layout::CONFIG_KEY)? {
            Some(bytes) => Self::decode(&bytes),
            None => Ok(Self::default()),
        }
    }
}

fn load_key_set(
    txn: &impl KvRead,
    container: &tidedb_storage::ContainerPath,
    encoded: &[u8],
) -> CoreResult<KeySet> {
    match txn.get(container, encoded)? {
        Some(bytes) => KeySet::from_value(&from_cbor(&bytes)?),
        None => Ok(KeySet::new()),
    }
}

fn decode_key(bytes: Vec<u8>) -> CoreResult<String> {
    String::from_utf8(bytes).map_err(|_| CoreError::internal("posted document key is not UTF-8"))
}
