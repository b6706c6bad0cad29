//! Per-topic multicast of change notifications.
//!
//! Every watch gets its own bounded queue. Publishing never blocks: a
//! subscriber whose queue is full (or whose receiver is gone) is closed and
//! dropped, and the consumer sees its channel disconnect.
//!
//! ```
//! use tidedb_core::TopicRegistry;
//!
//! let topics: TopicRegistry<u32> = TopicRegistry::new(2);
//! let rx = topics.watch("k");
//! topics.send("k", 1);
//! assert_eq!(rx.try_recv().unwrap(), 1);
//! ```

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use tracing::warn;

/// Subscribers of a single topic.
struct Watchers<M> {
    senders: Mutex<Vec<SyncSender<M>>>,
}

impl<M: Clone> Watchers<M> {
    fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Returns whether the topic was left without subscribers.
    fn send(&self, topic: &str, message: &M) -> bool {
        let mut senders = self.senders.lock();
        let mut i = 0;
        while i < senders.len() {
            match senders[i].try_send(message.clone()) {
                Ok(()) => i += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(topic, "evicting watcher that fell behind");
                    senders.swap_remove(i);
                }
                Err(TrySendError::Disconnected(_)) => {
                    senders.swap_remove(i);
                }
            }
        }
        senders.is_empty()
    }
}

/// Maps topic keys to their subscribers.
pub struct TopicRegistry<M> {
    topics: RwLock<HashMap<String, Arc<Watchers<M>>>>,
    capacity: usize,
}

impl<M: Clone> TopicRegistry<M> {
    /// Creates a registry whose subscriptions hold up to `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new subscription on `topic`.
    pub fn watch(&self, topic: &str) -> Receiver<M> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        self.subscribe(topic, tx);
        rx
    }

    /// Registers a new subscription on `topic` whose first message is
    /// `initial`, ahead of anything sent afterwards.
    pub fn watch_with_initial(&self, topic: &str, initial: M) -> Receiver<M> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        // a fresh queue always has room for one message
        let _ = tx.try_send(initial);
        self.subscribe(topic, tx);
        rx
    }

    /// Delivers `message` to every subscriber of `topic`, evicting the ones
    /// that cannot take it right now. A topic left with no subscribers is
    /// forgotten.
    pub fn send(&self, topic: &str, message: M) {
        let Some(watchers) = self.topics.read().get(topic).cloned() else {
            return;
        };
        if watchers.send(topic, &message) {
            let mut topics = self.topics.write();
            // a watch may have subscribed since the send
            let idle = topics
                .get(topic)
                .is_some_and(|w| Arc::ptr_eq(w, &watchers) && w.senders.lock().is_empty());
            if idle {
                topics.remove(topic);
            }
        }
    }

    /// Closes every subscription of `topic` and forgets the topic.
    pub fn close(&self, topic: &str) {
        if let Some(watchers) = self.topics.write().remove(topic) {
            watchers.senders.lock().clear();
        }
    }

    /// Closes every subscription of every topic.
    pub fn close_all(&self) {
        let mut topics = self.topics.write();
        for watchers in topics.values() {
            watchers.senders.lock().clear();
        }
        topics.clear();
    }

    /// Number of live subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, |w| w.senders.lock().len())
    }

    /// Number of topics with a subscriber list.
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    /// Adds `tx` to the topic while holding the map lock, so pruning in
    /// [`send`](Self::send) cannot drop the topic under it.
    fn subscribe(&self, topic: &str, tx: SyncSender<M>) {
        {
            let topics = self.topics.read();
            if let Some(watchers) = topics.get(topic) {
                watchers.senders.lock().push(tx);
                return;
            }
        }
        self.topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(Watchers::new()))
            .senders
            .lock()
            .push(tx);
    }
}

impl<M> std::fmt::Debug for TopicRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("topics", &self.topics.read().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
