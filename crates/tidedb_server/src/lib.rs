//! # TideDB Server
//!
//! Transport-agnostic request router for TideDB.
//!
//! Routes, relative to the server root:
//!
//! | Method     | Path                          | Body         |
//! |------------|-------------------------------|--------------|
//! | GET        | `{type}/data/{key}`           |              |
//! | PUT, POST  | `{type}/data/{key}`           | document     |
//! | DELETE     | `{type}/data/{key}`           |              |
//! | GET        | `{type}/data/{key}/watch`     |              |
//! | POST       | `{type}/index/{name}/query`   | value        |
//! | PUT, POST  | `{type}/index/{name}`         | index config |
//! | DELETE     | `{type}/index/{name}`         |              |
//! | POST       | `{type}/index/{name}/watch`   | value        |
//!
//! Bodies are JSON. An index config is `{"unique": bool, "exclude": [..]}`,
//! both fields optional. Watch routes answer with a [`Response::Stream`].
//!
//! Failures answer with `{"error": message}` and a status code: unknown
//! index 404, unique overlap 409, malformed request 400, anything else 500.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(not(test), warn(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod error;
mod handler;
mod route;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{Request, RequestHandler, Response, WatchStream};
pub use route::{percent_decode, Method, Route};
pub use server::Server;
