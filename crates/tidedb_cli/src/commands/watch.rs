//! `watch`.

use super::{print_value, CommandResult};
use std::io::Write;
use tidedb_codec::Value;
use tidedb_core::Store;

/// What to watch.
pub enum Target<'a> {
    /// A single document.
    Document(&'a str),
    /// The keys posted under a value of an index.
    Index {
        /// Index name.
        name: &'a str,
        /// Indexed value.
        value: Value,
    },
}

/// Prints up to `count` messages of a watch, one JSON line each, and stops
/// early when the watch closes.
pub fn run(store: &Store, collection: &str, target: Target<'_>, count: usize, out: &mut impl Write) -> CommandResult {
    match target {
        Target::Document(key) => {
            let rx = store.watch(collection, key)?;
            for value in rx.iter().take(count) {
                print_value(out, &value, false)?;
            }
        }
        Target::Index { name, value } => {
            let rx = store.watch_index(collection, name, &value)?;
            for keys in rx.iter().take(count) {
                writeln!(out, "{}", serde_json::to_string(&keys)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidedb_core::IndexConfig;

    #[test]
    fn document_snapshot() {
        let store = Store::open_in_memory().unwrap();
        store.write("t", "a", &Value::object([("b", 1)])).unwrap();

        let mut out = Vec::new();
        run(&store, "t", Target::Document("a"), 1, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"b\":1}\n");
    }

    #[test]
    fn index_snapshot() {
        let store = Store::open_in_memory().unwrap();
        store.create_index("t", "b", IndexConfig::new()).unwrap();
        store.write("t", "a", &Value::object([("b", "c")])).unwrap();

        let mut out = Vec::new();
        let target = Target::Index {
            name: "b",
            value: Value::from("c"),
        };
        run(&store, "t", target, 1, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[\"a\"]\n");
    }

    #[test]
    fn stops_when_watch_closes() {
        let store = std::sync::Arc::new(Store::open_in_memory().unwrap());
        let writer = {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                store.write("t", "a", &Value::from(1)).unwrap();
                store.delete("t", "a").unwrap();
            })
        };

        let mut out = Vec::new();
        run(&store, "t", Target::Document("a"), 10, &mut out).unwrap();
        writer.join().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "null\n1\nnull\n");
    }

    #[test]
    fn unknown_index_fails() {
        let store = Store::open_in_memory().unwrap();
        let target = Target::Index {
            name: "nope",
            value: Value::Null,
        };
        assert!(run(&store, "t", target, 1, &mut Vec::new()).is_err());
    }
}
