//! # TideDB Core
//!
//! Embedded document store with secondary indexes and live watches.
//!
//! This crate provides:
//! - Named collections of JSON-like documents ([`Store`])
//! - Secondary indexes on dotted field paths, unique or not, with value
//!   exclusions ([`IndexConfig`])
//! - Watches on single documents and on index values, delivered through
//!   bounded channels that never block writers ([`TopicRegistry`])
//!
//! Persistence, transactions and crash safety come from the engine behind
//! `tidedb_storage`; documents are stored as canonical CBOR from
//! `tidedb_codec`.
//!
//! ## Example
//!
//! ```rust
//! use tidedb_codec::Value;
//! use tidedb_core::{IndexConfig, Store};
//!
//! let store = Store::open_in_memory().unwrap();
//! store.create_index("t", "b", IndexConfig::new()).unwrap();
//!
//! let watch = store.watch_index("t", "b", &Value::from("c")).unwrap();
//! assert!(watch.recv().unwrap().is_empty());
//!
//! store.write("t", "a", &Value::object([("b", "c")])).unwrap();
//! assert_eq!(watch.recv().unwrap(), vec!["a".to_string()]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used))]

mod collection;
mod config;
mod error;
mod index;
mod keyset;
mod layout;
mod path;
mod store;
mod topics;

pub use collection::{CollectionCache, CollectionState, IndexTopics};
pub use config::{Config, DEFAULT_WATCH_CAPACITY};
pub use error::{CoreError, CoreResult};
pub use index::{value_topic, CollectionConfig, IndexConfig, IndexDefinition, IndexEvent};
pub use keyset::KeySet;
pub use path::{json_path, navigate, split_path};
pub use store::Store;
pub use topics::TopicRegistry;
