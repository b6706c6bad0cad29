//! Per-collection runtime state and its process-wide cache.

use crate::error::CoreResult;
use crate::index::{CollectionConfig, IndexEvent};
use crate::topics::TopicRegistry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tidedb_codec::Value;
use tidedb_storage::KvRead;

/// Watchers of one index, keyed by encoded index value.
pub type IndexTopics = TopicRegistry<Vec<String>>;

/// Cached state of one collection.
///
/// Created the first time any operation touches the collection and kept
/// until the store closes.
pub struct CollectionState {
    name: String,
    config: RwLock<CollectionConfig>,
    documents: TopicRegistry<Value>,
    index_topics: RwLock<HashMap<String, Arc<IndexTopics>>>,
    watch_capacity: usize,
}

impl CollectionState {
    fn new(name: &str, config: CollectionConfig, watch_capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            config: RwLock::new(config),
            documents: TopicRegistry::new(watch_capacity),
            index_topics: RwLock::new(HashMap::new()),
            watch_capacity,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The index configuration. Document writes hold the read side, index
    /// creation and removal the write side.
    pub fn config(&self) -> &RwLock<CollectionConfig> {
        &self.config
    }

    /// Watchers of individual documents, keyed by document key.
    pub fn documents(&self) -> &TopicRegistry<Value> {
        &self.documents
    }

    /// Watchers of `index`, created on first use.
    pub fn index_topics(&self, index: &str) -> Arc<IndexTopics> {
        if let Some(topics) = self.index_topics.read().get(index) {
            return Arc::clone(topics);
        }
        let mut all = self.index_topics.write();
        Arc::clone(
            all.entry(index.to_string())
                .or_insert_with(|| Arc::new(TopicRegistry::new(self.watch_capacity))),
        )
    }

    /// Delivers committed posting changes to their watchers.
    pub fn publish_index_events(&self, events: Vec<IndexEvent>) {
        for event in events {
            let topics = self.index_topics.read().get(&event.index).cloned();
            if let Some(topics) = topics {
                topics.send(&event.topic, event.keys);
            }
        }
    }

    /// Closes and forgets every watcher of `index`.
    pub fn close_index(&self, index: &str) {
        if let Some(topics) = self.index_topics.write().remove(index) {
            topics.close_all();
        }
    }

    /// Closes every watcher in the collection.
    pub fn close_all(&self) {
        self.documents.close_all();
        let mut all = self.index_topics.write();
        for topics in all.values() {
            topics.close_all();
        }
        all.clear();
    }
}

impl std::fmt::Debug for CollectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionState")
            .field("name", &self.name)
            .field("indexes", &self.config.read().indexes().len())
            .field("document_topics", &self.documents.topic_count())
            .finish_non_exhaustive()
    }
}

/// Lazily populated map of collection name to [`CollectionState`].
pub struct CollectionCache {
    states: RwLock<HashMap<String, Arc<CollectionState>>>,
    watch_capacity: usize,
}

impl CollectionCache {
    /// Creates an empty cache.
    pub fn new(watch_capacity: usize) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            watch_capacity,
        }
    }

    /// Returns the state of `name`, reading its persisted config through
    /// `txn` the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted config cannot be read.
    pub fn get_or_load(&self, txn: &impl KvRead, name: &str) -> CoreResult<Arc<CollectionState>> {
        if let Some(state) = self.states.read().get(name) {
            return Ok(Arc::clone(state));
        }
        let mut states = self.states.write();
        if let Some(state) = states.get(name) {
            return Ok(Arc::clone(state));
        }
        let config = CollectionConfig::load(txn, name)?;
        let state = Arc::new(CollectionState::new(name, config, self.watch_capacity));
        states.insert(name.to_string(), Arc::clone(&state));
        Ok(state)
    }

    /// Number of cached collections.
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }

    /// Closes every watcher of every cached collection.
    pub fn close_all(&self) {
        for state in self.states.read().values() {
            state.close_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexConfig, IndexDefinition};
    use crate::layout;
    use std::sync::mpsc::RecvError;
    use tidedb_storage::Engine;

    #[test]
    fn state_is_created_once() {
        let engine = Engine::open_in_memory().unwrap();
        let cache = CollectionCache::new(5);
        let read = engine.begin_read().unwrap();

        let a = cache.get_or_load(&read, "t").unwrap();
        let b = cache.get_or_load(&read, "t").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(a.config().read().indexes().is_empty());
    }

    #[test]
    fn persisted_config_is_loaded() {
        let engine = Engine::open_in_memory().unwrap();
        let mut config = CollectionConfig::default();
        config.push(IndexDefinition::new("b", &IndexConfig::new()).unwrap());

        let mut txn = engine.begin_write().unwrap();
        txn.put(&layout::collection("t"), layout::CONFIG_KEY, &config.encode().unwrap())
            .unwrap();
        txn.commit().unwrap();

        let cache = CollectionCache::new(5);
        let state = cache
            .get_or_load(&engine.begin_read().unwrap(), "t")
            .unwrap();
        assert!(state.config().read().find("b").is_some());
    }

    #[test]
    fn index_events_reach_index_watchers() {
        let engine = Engine::open_in_memory().unwrap();
        let cache = CollectionCache::new(5);
        let state = cache
            .get_or_load(&engine.begin_read().unwrap(), "t")
            .unwrap();

        let rx = state.index_topics("b").watch("61");
        state.publish_index_events(vec![
            IndexEvent {
                index: "b".into(),
                topic: "61".into(),
                keys: vec!["k".into()],
            },
            IndexEvent {
                index: "unwatched".into(),
                topic: "61".into(),
                keys: Vec::new(),
            },
        ]);
        assert_eq!(rx.recv().unwrap(), vec!["k".to_string()]);

        state.close_index("b");
        assert_eq!(rx.recv(), Err(RecvError));
    }

    #[test]
    fn close_all_closes_documents_and_indexes() {
        let engine = Engine::open_in_memory().unwrap();
        let cache = CollectionCache::new(5);
        let state = cache
            .get_or_load(&engine.begin_read().unwrap(), "t")
            .unwrap();
        let doc_rx = state.documents().watch("k");
        let idx_rx = state.index_topics("b").watch("61");

        cache.close_all();

        assert_eq!(doc_rx.recv(), Err(RecvError));
        assert_eq!(idx_rx.recv(), Err(RecvError));
    }
}
