//! # TideDB Storage
//!
//! Transactional key-value engine adapter for TideDB.
//!
//! This crate is the only place that talks to the underlying engine
//! ([redb](https://docs.rs/redb)). It exposes what the document layer needs
//! and nothing more:
//!
//! - Nested containers addressed by [`ContainerPath`]
//! - A single writer ([`WriteTxn`]) and concurrent snapshot readers ([`ReadTxn`])
//! - Byte keys and byte values, ordered by key
//!
//! The engine owns durability, paging and crash recovery. Keys and values
//! are opaque here; the document layer owns their interpretation.
//!
//! ## Example
//!
//! ```rust
//! use tidedb_storage::{ContainerPath, Engine};
//!
//! let engine = Engine::open_in_memory().unwrap();
//! let data = ContainerPath::root("users").child("data");
//!
//! let mut txn = engine.begin_write().unwrap();
//! txn.put(&data, b"alice", b"hello").unwrap();
//! txn.commit().unwrap();
//!
//! let read = engine.begin_read().unwrap();
//! assert_eq!(read.get(&data, b"alice").unwrap(), Some(b"hello".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used))]

mod engine;
mod error;
mod path;

pub use engine::{Engine, Entries, KvRead, ReadTxn, WriteTxn};
pub use error::{StorageError, StorageResult};
pub use path::ContainerPath;
