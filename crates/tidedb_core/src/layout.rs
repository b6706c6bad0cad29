//! Where a collection's records live in the engine.
//!
//! ```text
//! {collection}/              config record under key "config"
//! {collection}/data/         document key -> CBOR document
//! {collection}/indexes/{i}/  CBOR index value -> posting
//! ```

use tidedb_storage::ContainerPath;

const DATA: &str = "data";
const INDEXES: &str = "indexes";

/// Key of the config record inside the collection container.
pub const CONFIG_KEY: &[u8] = b"config";

/// The top-level container of a collection.
pub fn collection(name: &str) -> ContainerPath {
    ContainerPath::root(name)
}

/// Container holding the collection's documents.
pub fn data(collection_name: &str) -> ContainerPath {
    collection(collection_name).child(DATA)
}

/// Container holding all index posting containers of a collection.
pub fn indexes(collection_name: &str) -> ContainerPath {
    collection(collection_name).child(INDEXES)
}

/// Posting container of one index.
pub fn index(collection_name: &str, index_name: &str) -> ContainerPath {
    indexes(collection_name).child(index_name)
}
