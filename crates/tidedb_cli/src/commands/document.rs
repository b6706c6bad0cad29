//! `get`, `put` and `delete`.

use super::{print_value, CommandResult};
use std::io::Write;
use tidedb_codec::Value;
use tidedb_core::Store;
use tracing::info;

/// Prints the document under `key`, or `null` when there is none.
pub fn get(store: &Store, collection: &str, key: &str, pretty: bool, out: &mut impl Write) -> CommandResult {
    let value = store.read(collection, key)?.unwrap_or(Value::Null);
    print_value(out, &value, pretty)
}

/// Stores `value` under `key`.
pub fn put(store: &Store, collection: &str, key: &str, value: &Value) -> CommandResult {
    store.write(collection, key, value)?;
    info!(collection, key, "stored document");
    Ok(())
}

/// Removes the document under `key`.
pub fn delete(store: &Store, collection: &str, key: &str) -> CommandResult {
    store.delete(collection, key)?;
    info!(collection, key, "deleted document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parse_json;

    fn output(f: impl FnOnce(&mut Vec<u8>) -> CommandResult) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn put_get_delete() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "users", "alice", &parse_json(r#"{"age":30}"#).unwrap()).unwrap();

        let printed = output(|out| get(&store, "users", "alice", false, out));
        assert_eq!(printed, "{\"age\":30}\n");

        delete(&store, "users", "alice").unwrap();
        let printed = output(|out| get(&store, "users", "alice", false, out));
        assert_eq!(printed, "null\n");
    }

    #[test]
    fn pretty_output() {
        let store = Store::open_in_memory().unwrap();
        put(&store, "t", "a", &parse_json(r#"{"b":[1]}"#).unwrap()).unwrap();
        let printed = output(|out| get(&store, "t", "a", true, out));
        assert!(printed.contains("\n  \"b\""));
    }
}
