//! Store facade.

use crate::collection::{CollectionCache, CollectionState};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::{value_topic, IndexConfig, IndexDefinition};
use crate::layout;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tidedb_codec::{from_cbor, to_canonical_cbor, Value};
use tidedb_storage::{Engine, WriteTxn};
use tracing::{debug, info};

/// The main store handle.
///
/// `Store` holds documents in named collections, keeps secondary indexes in
/// step with every write, and pushes changes to watchers.
///
/// # Transactions
///
/// Each operation runs in its own engine transaction: a snapshot read for
/// lookups, the single write transaction for mutations. A failed mutation
/// leaves nothing behind and notifies nobody.
///
/// # Watches
///
/// [`Store::watch`] and [`Store::watch_index`] return a bounded channel
/// whose first message is the current state. Later messages follow commit
/// order. A watcher that lets its queue fill up is disconnected rather than
/// slowing writers down.
///
/// ```rust
/// use tidedb_codec::Value;
/// use tidedb_core::{IndexConfig, Store};
///
/// let store = Store::open_in_memory().unwrap();
/// store.write("users", "alice", &Value::object([("email", "a@x.io")])).unwrap();
/// store.create_index("users", "email", IndexConfig::new().unique(true)).unwrap();
///
/// let keys = store.query_index("users", "email", &Value::from("a@x.io")).unwrap();
/// assert_eq!(keys, vec!["alice".to_string()]);
/// ```
pub struct Store {
    config: Config,
    /// `None` once closed.
    engine: RwLock<Option<Engine>>,
    collections: CollectionCache,
    /// Held for write while a commit is being published, for read while a
    /// watch takes its snapshot.
    publish_gate: RwLock<()>,
}

impl Store {
    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open the file.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens the database file at `path` with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open the file, or if the file
    /// is missing and `create_if_missing` is off.
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let path = path.as_ref();
        let engine = if config.create_if_missing {
            Engine::open(path)?
        } else {
            Engine::open_existing(path)?
        };
        info!(path = %path.display(), "opened store");
        Ok(Self::with_engine(engine, config))
    }

    /// Creates a store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to initialize.
    pub fn open_in_memory() -> CoreResult<Self> {
        Ok(Self::with_engine(Engine::open_in_memory()?, Config::default()))
    }

    fn with_engine(engine: Engine, config: Config) -> Self {
        Self {
            collections: CollectionCache::new(config.watch_capacity),
            config,
            engine: RwLock::new(Some(engine)),
            publish_gate: RwLock::new(()),
        }
    }

    /// Returns store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.engine.read().is_some()
    }

    /// Borrow the engine for the length of one operation.
    fn engine(&self) -> CoreResult<MappedRwLockReadGuard<'_, Engine>> {
        RwLockReadGuard::try_map(self.engine.read(), Option::as_ref)
            .map_err(|_| CoreError::DatabaseClosed)
    }

    /// Starts a write transaction with the collection container in place
    /// and its state loaded.
    fn begin_collection_write(
        &self,
        engine: &Engine,
        collection: &str,
    ) -> CoreResult<(WriteTxn, Arc<CollectionState>)> {
        let mut txn = engine.begin_write()?;
        txn.create_container(&layout::collection(collection))?;
        txn.create_container(&layout::data(collection))?;
        let state = self.collections.get_or_load(&txn, collection)?;
        Ok((txn, state))
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Stores `value` under `key`, replacing any previous document.
    ///
    /// Watchers of the key receive the new value even if the document did
    /// not exist before.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UniqueIndexOverlap`] if a unique index would
    /// map the new value to a second document, or with an internal error if
    /// storage or encoding fails. The store is unchanged in either case.
    pub fn write(&self, collection: &str, key: &str, value: &Value) -> CoreResult<()> {
        let engine = self.engine()?;
        let raw = to_canonical_cbor(value)?;
        let (mut txn, state) = self.begin_collection_write(&*engine, collection)?;
        let config = state.config().read();

        let data = layout::data(collection);
        let mut events = Vec::new();
        if !config.indexes().is_empty() {
            if let Some(old) = txn.get(&data, key.as_bytes())? {
                let old = from_cbor(&old)?;
                for index in config.indexes() {
                    index.clear(&mut txn, collection, key, &old, &mut events)?;
                }
            }
            for index in config.indexes() {
                index.set(&mut txn, collection, key, value, &mut events)?;
            }
        }
        txn.put(&data, key.as_bytes(), &raw)?;

        let _gate = self.publish_gate.write();
        txn.commit()?;
        state.publish_index_events(events);
        state.documents().send(key, value.clone());
        debug!(collection, key, "wrote document");
        Ok(())
    }

    /// Removes the document under `key`. Removing a missing document
    /// succeeds.
    ///
    /// Watchers of the key receive `Value::Null` and are then disconnected.
    ///
    /// # Errors
    ///
    /// Returns an internal error if storage or decoding fails.
    pub fn delete(&self, collection: &str, key: &str) -> CoreResult<()> {
        let engine = self.engine()?;
        let (mut txn, state) = self.begin_collection_write(&*engine, collection)?;
        let config = state.config().read();

        let data = layout::data(collection);
        let mut events = Vec::new();
        if !config.indexes().is_empty() {
            if let Some(old) = txn.get(&data, key.as_bytes())? {
                let old = from_cbor(&old)?;
                for index in config.indexes() {
                    index.clear(&mut txn, collection, key, &old, &mut events)?;
                }
            }
        }
        let existed = txn.delete(&data, key.as_bytes())?;

        let _gate = self.publish_gate.write();
        txn.commit()?;
        state.publish_index_events(events);
        state.documents().send(key, Value::Null);
        state.documents().close(key);
        debug!(collection, key, existed, "deleted document");
        Ok(())
    }

    /// Reads the document under `key`. A missing collection or key reads as
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if storage or decoding fails.
    pub fn read(&self, collection: &str, key: &str) -> CoreResult<Option<Value>> {
        let engine = self.engine()?;
        let txn = engine.begin_read()?;
        match txn.get(&layout::data(collection), key.as_bytes())? {
            Some(raw) => Ok(Some(from_cbor(&raw)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Keys of the documents whose `index` field equals `value`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexNotFound`] if the collection has no such
    /// index.
    pub fn query_index(&self, collection: &str, index: &str, value: &Value) -> CoreResult<Vec<String>> {
        let engine = self.engine()?;
        let state = {
            let txn = engine.begin_read()?;
            self.collections.get_or_load(&txn, collection)?
        };
        let config = state.config().read();
        let definition = config
            .find(index)
            .ok_or_else(|| CoreError::index_not_found(collection, index))?;

        // the snapshot must postdate any backfill that published `definition`
        let txn = engine.begin_read()?;
        definition.get(&txn, collection, value)
    }

    /// Creates the index `name`, whose name is also the dotted field path it
    /// indexes, and posts every existing document. Creating an index that
    /// already exists does nothing.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UniqueIndexOverlap`] if `config` asks for a
    /// unique index and existing documents share a value. The index is not
    /// created in that case.
    pub fn create_index(&self, collection: &str, name: &str, config: IndexConfig) -> CoreResult<()> {
        let engine = self.engine()?;
        let (mut txn, state) = self.begin_collection_write(&*engine, collection)?;
        let mut current = state.config().write();
        if current.find(name).is_some() {
            txn.abort()?;
            return Ok(());
        }

        let definition = IndexDefinition::new(name, &config)?;
        let mut updated = current.clone();
        updated.push(definition.clone());
        txn.put(&layout::collection(collection), layout::CONFIG_KEY, &updated.encode()?)?;
        txn.create_container(&layout::index(collection, name))?;

        let mut events = Vec::new();
        let documents = txn.entries(&layout::data(collection))?;
        let backfilled = documents.len();
        for (key, raw) in documents {
            let key = String::from_utf8(key)
                .map_err(|_| CoreError::internal("document key is not UTF-8"))?;
            let doc = from_cbor(&raw)?;
            definition.set(&mut txn, collection, &key, &doc, &mut events)?;
        }

        let _gate = self.publish_gate.write();
        txn.commit()?;
        *current = updated;
        state.publish_index_events(events);
        info!(
            collection,
            index = name,
            unique = config.unique,
            backfilled,
            "created index"
        );
        Ok(())
    }

    /// Drops the index `name` and all of its postings, disconnecting its
    /// watchers. Dropping a missing index succeeds.
    ///
    /// # Errors
    ///
    /// Returns an internal error if storage fails.
    pub fn delete_index(&self, collection: &str, name: &str) -> CoreResult<()> {
        let engine = self.engine()?;
        let (mut txn, state) = self.begin_collection_write(&*engine, collection)?;
        let mut current = state.config().write();

        let mut updated = current.clone();
        let existed = updated.remove(name);
        if existed {
            txn.put(&layout::collection(collection), layout::CONFIG_KEY, &updated.encode()?)?;
        }
        txn.delete_container(&layout::index(collection, name))?;

        let _gate = self.publish_gate.write();
        txn.commit()?;
        *current = updated;
        state.close_index(name);
        info!(collection, index = name, existed, "deleted index");
        Ok(())
    }

    /// Index definitions of `collection`, in persisted order.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the persisted config cannot be read.
    pub fn list_indexes(&self, collection: &str) -> CoreResult<Vec<IndexDefinition>> {
        let engine = self.engine()?;
        let txn = engine.begin_read()?;
        let state = self.collections.get_or_load(&txn, collection)?;
        let definitions = state.config().read().indexes().to_vec();
        Ok(definitions)
    }

    // ========================================================================
    // Watches
    // ========================================================================

    /// Watches the document under `key`.
    ///
    /// The first message is the current value (`Value::Null` if absent);
    /// every later write sends the new value, and a delete sends
    /// `Value::Null` and disconnects.
    ///
    /// # Errors
    ///
    /// Returns an internal error if storage or decoding fails.
    pub fn watch(&self, collection: &str, key: &str) -> CoreResult<Receiver<Value>> {
        let engine = self.engine()?;
        let _gate = self.publish_gate.read();
        let txn = engine.begin_read()?;
        let state = self.collections.get_or_load(&txn, collection)?;
        let current = match txn.get(&layout::data(collection), key.as_bytes())? {
            Some(raw) => from_cbor(&raw)?,
            None => Value::Null,
        };
        debug!(collection, key, "watching document");
        Ok(state.documents().watch_with_initial(key, current))
    }

    /// Watches the keys posted under `value` in `index`.
    ///
    /// The first message is the current posting; every later change to it
    /// sends the full key list.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexNotFound`] if the collection has no such
    /// index.
    pub fn watch_index(
        &self,
        collection: &str,
        index: &str,
        value: &Value,
    ) -> CoreResult<Receiver<Vec<String>>> {
        let engine = self.engine()?;
        let encoded = to_canonical_cbor(value)?;
        let state = {
            let txn = engine.begin_read()?;
            self.collections.get_or_load(&txn, collection)?
        };
        let config = state.config().read();
        let definition = config
            .find(index)
            .ok_or_else(|| CoreError::index_not_found(collection, index))?;

        let _gate = self.publish_gate.read();
        let txn = engine.begin_read()?;
        let current = definition.get_encoded(&txn, collection, &encoded)?;
        debug!(collection, index, "watching index value");
        Ok(state
            .index_topics(index)
            .watch_with_initial(&value_topic(&encoded), current))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the store and disconnects every watcher. Later operations fail
    /// with [`CoreError::DatabaseClosed`]. Closing twice is harmless.
    ///
    /// # Errors
    ///
    /// Currently infallible; the engine flushes on drop.
    pub fn close(&self) -> CoreResult<()> {
        let mut engine = self.engine.write();
        if engine.take().is_none() {
            return Ok(());
        }
        let _gate = self.publish_gate.write();
        self.collections.close_all();
        info!(collections = self.collections.len(), "closed store");
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("is_open", &self.is_open())
            .field("collections", &self.collections.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{RecvError, TryRecvError};

    fn create_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn doc(b: &str) -> Value {
        Value::object([("b", b)])
    }

    #[test]
    fn open_in_memory() {
        let store = create_store();
        assert!(store.is_open());
    }

    #[test]
    fn write_then_read() {
        let store = create_store();
        store.write("t", "a", &doc("c")).unwrap();
        assert_eq!(store.read("t", "a").unwrap(), Some(doc("c")));
        assert_eq!(store.read("t", "missing").unwrap(), None);
        assert_eq!(store.read("nope", "a").unwrap(), None);
    }

    #[test]
    fn read_does_not_create_state() {
        let store = create_store();
        store.read("t", "a").unwrap();
        assert!(store.collections.is_empty());
    }

    #[test]
    fn delete_removes() {
        let store = create_store();
        store.write("t", "a", &doc("c")).unwrap();
        store.delete("t", "a").unwrap();
        store.delete("t", "a").unwrap();
        assert_eq!(store.read("t", "a").unwrap(), None);
    }

    #[test]
    fn query_unknown_index() {
        let store = create_store();
        let err = store.query_index("t", "b", &Value::from("c")).unwrap_err();
        assert!(matches!(err, CoreError::IndexNotFound { .. }));
        let err = store.watch_index("t", "b", &Value::from("c")).unwrap_err();
        assert!(matches!(err, CoreError::IndexNotFound { .. }));
    }

    #[test]
    fn create_index_is_idempotent() {
        let store = create_store();
        store.create_index("t", "b", IndexConfig::new()).unwrap();
        store
            .create_index("t", "b", IndexConfig::new().unique(true))
            .unwrap();
        let indexes = store.list_indexes("t").unwrap();
        assert_eq!(indexes.len(), 1);
        assert!(!indexes[0].is_unique());
    }

    #[test]
    fn watch_receives_snapshot_then_changes() {
        let store = create_store();
        store.write("t", "a", &doc("c")).unwrap();

        let rx = store.watch("t", "a").unwrap();
        store.write("t", "a", &doc("d")).unwrap();
        store.delete("t", "a").unwrap();

        assert_eq!(rx.recv().unwrap(), doc("c"));
        assert_eq!(rx.recv().unwrap(), doc("d"));
        assert_eq!(rx.recv().unwrap(), Value::Null);
        assert_eq!(rx.recv(), Err(RecvError));
    }

    #[test]
    fn watch_missing_document_starts_with_null() {
        let store = create_store();
        let rx = store.watch("t", "a").unwrap();
        assert_eq!(rx.recv().unwrap(), Value::Null);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn failed_write_notifies_nobody() {
        let store = create_store();
        store
            .create_index("t", "b", IndexConfig::new().unique(true))
            .unwrap();
        store.write("t", "a", &doc("c")).unwrap();

        let rx = store.watch("t", "x").unwrap();
        assert_eq!(rx.recv().unwrap(), Value::Null);

        let err = store.write("t", "x", &doc("c")).unwrap_err();
        assert!(matches!(err, CoreError::UniqueIndexOverlap { .. }));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(store.read("t", "x").unwrap(), None);
    }

    #[test]
    fn close_database() {
        let store = create_store();
        let rx = store.watch("t", "a").unwrap();
        assert!(store.is_open());

        store.close().unwrap();
        assert!(!store.is_open());
        store.close().unwrap();

        assert_eq!(rx.recv().unwrap(), Value::Null);
        assert_eq!(rx.recv(), Err(RecvError));
        assert!(matches!(
            store.write("t", "a", &doc("c")),
            Err(CoreError::DatabaseClosed)
        ));
        assert!(matches!(store.read("t", "a"), Err(CoreError::DatabaseClosed)));
    }
}
