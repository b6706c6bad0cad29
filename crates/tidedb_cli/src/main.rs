//! TideDB CLI
//!
//! Command-line access to a TideDB database file.
//!
//! # Commands
//!
//! - `get`, `put`, `delete` - Read and modify documents
//! - `query` - List the keys an index holds for a value
//! - `create-index`, `drop-index`, `indexes` - Manage secondary indexes
//! - `watch` - Print the current value of a document or index posting, and
//!   any changes that follow

mod commands;

use clap::{Parser, Subcommand};
use commands::watch::Target;
use commands::{document, index, open_store, parse_json, watch};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// TideDB command-line tools.
#[derive(Parser)]
#[command(name = "tidedb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a document as JSON
    Get {
        /// Collection name
        collection: String,
        /// Document key
        key: String,
        /// Pretty-print the document
        #[arg(long)]
        pretty: bool,
    },

    /// Store a JSON document
    Put {
        /// Collection name
        collection: String,
        /// Document key
        key: String,
        /// Document as JSON
        json: String,
    },

    /// Delete a document
    Delete {
        /// Collection name
        collection: String,
        /// Document key
        key: String,
    },

    /// List the keys an index holds for a JSON value
    Query {
        /// Collection name
        collection: String,
        /// Index name
        index: String,
        /// Indexed value as JSON
        value: String,
    },

    /// Create an index on a dotted field path
    CreateIndex {
        /// Collection name
        collection: String,
        /// Index name, also the field path
        name: String,
        /// Allow at most one document per value
        #[arg(short, long)]
        unique: bool,
        /// JSON value never to index (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Drop an index
    DropIndex {
        /// Collection name
        collection: String,
        /// Index name
        name: String,
    },

    /// List the indexes of a collection
    Indexes {
        /// Collection name
        collection: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Watch a document, or with --index the keys posted under a value
    Watch {
        /// Collection name
        collection: String,
        /// Document key, or the JSON value when --index is given
        target: String,
        /// Index to watch
        #[arg(short, long)]
        index: Option<String>,
        /// Number of messages to print before exiting
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let path = || cli.path.clone().ok_or("Database path required (--path)");
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Get {
            ref collection,
            ref key,
            pretty,
        } => {
            let store = open_store(&path()?, false)?;
            document::get(&store, collection, key, pretty, &mut out)?;
        }
        Commands::Put {
            ref collection,
            ref key,
            ref json,
        } => {
            let value = parse_json(json)?;
            let store = open_store(&path()?, true)?;
            document::put(&store, collection, key, &value)?;
        }
        Commands::Delete {
            ref collection,
            ref key,
        } => {
            let store = open_store(&path()?, false)?;
            document::delete(&store, collection, key)?;
        }
        Commands::Query {
            ref collection,
            ref index,
            ref value,
        } => {
            let value = parse_json(value)?;
            let store = open_store(&path()?, false)?;
            index::query(&store, collection, index, &value, &mut out)?;
        }
        Commands::CreateIndex {
            ref collection,
            ref name,
            unique,
            ref exclude,
        } => {
            let exclude = exclude
                .iter()
                .map(|e| parse_json(e))
                .collect::<Result<Vec<_>, _>>()?;
            let store = open_store(&path()?, true)?;
            index::create(&store, collection, name, unique, exclude)?;
        }
        Commands::DropIndex {
            ref collection,
            ref name,
        } => {
            let store = open_store(&path()?, false)?;
            index::remove(&store, collection, name)?;
        }
        Commands::Indexes {
            ref collection,
            ref format,
        } => {
            let store = open_store(&path()?, false)?;
            index::list(&store, collection, format, &mut out)?;
        }
        Commands::Watch {
            ref collection,
            ref target,
            ref index,
            count,
        } => {
            let target = match index {
                Some(name) => Target::Index {
                    name,
                    value: parse_json(target)?,
                },
                None => Target::Document(target),
            };
            let store = open_store(&path()?, false)?;
            watch::run(&store, collection, target, count, &mut out)?;
        }
        Commands::Version => {
            println!("TideDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_create_index_flags() {
        let cli = Cli::parse_from([
            "tidedb", "--path", "db.redb", "create-index", "users", "email", "--unique",
            "--exclude", "\"\"", "--exclude", "null",
        ]);
        match cli.command {
            Commands::CreateIndex {
                collection,
                name,
                unique,
                exclude,
            } => {
                assert_eq!(collection, "users");
                assert_eq!(name, "email");
                assert!(unique);
                assert_eq!(exclude, vec!["\"\"", "null"]);
            }
            _ => panic!("expected create-index"),
        }
        assert_eq!(cli.path, Some(PathBuf::from("db.redb")));
    }

    #[test]
    fn parses_index_watch() {
        let cli = Cli::parse_from(["tidedb", "watch", "t", "\"c\"", "--index", "b", "-c", "3", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Watch {
                target, index, count, ..
            } => {
                assert_eq!(target, "\"c\"");
                assert_eq!(index.as_deref(), Some("b"));
                assert_eq!(count, 3);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn commands_against_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.redb");
        assert!(open_store(&path, false).is_err());

        {
            let store = open_store(&path, true).unwrap();
            document::put(&store, "t", "a", &parse_json(r#"{"b":"c"}"#).unwrap()).unwrap();
            index::create(&store, "t", "b", false, Vec::new()).unwrap();
        }

        let store = open_store(&path, false).unwrap();
        let mut out = Vec::new();
        index::query(&store, "t", "b", &parse_json("\"c\"").unwrap(), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a\n");
    }
}
