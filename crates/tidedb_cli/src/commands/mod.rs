//! CLI command implementations.
//!
//! Every command writes its output to the given writer so it can be
//! captured in tests.

pub mod document;
pub mod index;
pub mod watch;

use std::error::Error;
use std::io::Write;
use std::path::Path;
use tidedb_codec::Value;
use tidedb_core::{Config, Store};

/// Result type shared by all commands.
pub type CommandResult = Result<(), Box<dyn Error>>;

/// Opens the store at `path`. Commands that only read pass `create = false`
/// so a mistyped path fails instead of leaving an empty file behind.
pub fn open_store(path: &Path, create: bool) -> Result<Store, Box<dyn Error>> {
    if !create && !path.exists() {
        return Err(format!("No database found at {}", path.display()).into());
    }
    Ok(Store::open_with_config(path, Config::new().create_if_missing(create))?)
}

/// Parses a JSON argument into a stored value.
pub fn parse_json(text: &str) -> Result<Value, Box<dyn Error>> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON {text:?}: {e}"))?;
    Ok(Value::from_json(json))
}

/// Writes `value` as one line of JSON, pretty-printed when asked.
pub fn print_value(out: &mut impl Write, value: &Value, pretty: bool) -> CommandResult {
    let json = value.to_json()?;
    if pretty {
        writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
    } else {
        writeln!(out, "{json}")?;
    }
    Ok(())
}
