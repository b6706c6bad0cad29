//! `query`, `create-index`, `drop-index` and `indexes`.

use super::CommandResult;
use serde::Serialize;
use std::io::Write;
use tidedb_codec::{from_cbor, Value};
use tidedb_core::{IndexConfig, IndexDefinition, Store};
use tracing::info;

/// Summary of one index as printed by `indexes`.
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    /// Index name, which is also its dotted field path.
    pub name: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Values the index never posts.
    pub exclude: Vec<serde_json::Value>,
}

impl IndexSummary {
    fn from_definition(definition: &IndexDefinition) -> Result<Self, Box<dyn std::error::Error>> {
        let exclude = definition
            .exclusions()
            .iter()
            .map(|raw| Ok(from_cbor(raw)?.to_json()?))
            .collect::<Result<Vec<_>, Box<dyn std::error::Error>>>()?;
        Ok(Self {
            name: definition.name().to_string(),
            unique: definition.is_unique(),
            exclude,
        })
    }
}

/// Prints the keys posted under `value`, one per line.
pub fn query(store: &Store, collection: &str, index: &str, value: &Value, out: &mut impl Write) -> CommandResult {
    for key in store.query_index(collection, index, value)? {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

/// Creates an index and backfills it.
pub fn create(store: &Store, collection: &str, name: &str, unique: bool, exclude: Vec<Value>) -> CommandResult {
    let config = exclude
        .into_iter()
        .fold(IndexConfig::new().unique(unique), IndexConfig::exclude);
    store.create_index(collection, name, config)?;
    info!(collection, index = name, unique, "index ready");
    Ok(())
}

/// Drops an index.
pub fn remove(store: &Store, collection: &str, name: &str) -> CommandResult {
    store.delete_index(collection, name)?;
    Ok(())
}

/// Lists the indexes of `collection` as text or JSON.
pub fn list(store: &Store, collection: &str, format: &str, out: &mut impl Write) -> CommandResult {
    let summaries = store
        .list_indexes(collection)?
        .iter()
        .map(IndexSummary::from_definition)
        .collect::<Result<Vec<_>, _>>()?;

    if format == "json" {
        writeln!(out, "{}", serde_json::to_string_pretty(&summaries)?)?;
        return Ok(());
    }
    if summaries.is_empty() {
        writeln!(out, "No indexes on {collection}")?;
    }
    for summary in &summaries {
        write!(out, "{}", summary.name)?;
        if summary.unique {
            write!(out, " (unique)")?;
        }
        if !summary.exclude.is_empty() {
            write!(out, " exclude {}", serde_json::Value::Array(summary.exclude.clone()))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
