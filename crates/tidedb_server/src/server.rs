//! The TideDB server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{Request, RequestHandler, Response};
use std::sync::Arc;
use tidedb_core::{Config, Store};
use tracing::info;

/// A store behind the request router.
///
/// The server owns no sockets: a transport accepts connections, turns each
/// request into a [`Request`], and writes the [`Response`] back, streaming
/// every message of a [`Response::Stream`] until it ends.
///
/// # Example
///
/// ```
/// use tidedb_server::{Request, Response, Server, ServerConfig};
///
/// let server = Server::in_memory(ServerConfig::default()).unwrap();
/// server.handle(&Request::put("/users/data/alice", r#"{"age":30}"#));
///
/// let Response::Json(status, body) = server.handle(&Request::get("/users/data/alice")) else {
///     unreachable!()
/// };
/// assert_eq!(status, 200);
/// assert_eq!(body["age"], 30);
/// ```
pub struct Server {
    store: Arc<Store>,
    handler: RequestHandler,
    config: ServerConfig,
}

impl Server {
    /// Opens the database at `config.db_path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = Store::open_with_config(
            &config.db_path,
            Config::new().watch_capacity(config.watch_capacity),
        )?;
        info!(path = %config.db_path.display(), "opened store for routing");
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Serves an in-memory store; `config.db_path` is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be created.
    pub fn in_memory(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self::with_store(config, Arc::new(Store::open_in_memory()?)))
    }

    /// Serves an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<Store>) -> Self {
        let handler = RequestHandler::new(Arc::clone(&store), &config);
        Self {
            store,
            handler,
            config,
        }
    }

    /// Handles one request.
    pub fn handle(&self, request: &Request) -> Response {
        self.handler.handle(request)
    }

    /// Returns the served store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Closes the store, ending every open stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to close.
    pub fn close(&self) -> ServerResult<()> {
        self.store.close()?;
        info!("server closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Method;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn index_scenario_over_requests() {
        let server = Server::in_memory(ServerConfig::default()).unwrap();

        assert_eq!(server.handle(&Request::put("/t/index/b", "{}")).status(), 201);
        server.handle(&Request::put("/t/data/a", r#"{"b":"c"}"#));
        server.handle(&Request::put("/t/data/a", r#"{"b":"d"}"#));
        server.handle(&Request::put("/t/data/b", r#"{"b":"c"}"#));

        let Response::Json(status, body) = server.handle(&Request::post("/t/index/b/query", r#""c""#))
        else {
            panic!("expected json");
        };
        assert_eq!(status, 200);
        assert_eq!(body, json!(["b"]));
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let config = ServerConfig::new(dir.path().join("server.redb"));

        let server = Server::open(config.clone()).unwrap();
        server.handle(&Request::new(Method::Post, "/t/data/a", "[1,2]"));
        server.close().unwrap();
        drop(server);

        let server = Server::open(config).unwrap();
        let Response::Json(_, body) = server.handle(&Request::get("/t/data/a")) else {
            panic!("expected json");
        };
        assert_eq!(body, json!([1, 2]));
    }

    #[test]
    fn close_ends_streams_and_fails_requests() {
        let server = Server::in_memory(ServerConfig::default()).unwrap();
        let Response::Stream(stream) = server.handle(&Request::get("/t/data/a/watch")) else {
            panic!("expected a stream");
        };
        server.close().unwrap();

        let rest: Vec<_> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(rest, vec![serde_json::Value::Null]);
        assert_eq!(server.handle(&Request::get("/t/data/a")).status(), 500);
    }

    #[test]
    fn watch_capacity_comes_from_config() {
        let dir = tempdir().unwrap();
        let server =
            Server::open(ServerConfig::new(dir.path().join("s.redb")).with_watch_capacity(7)).unwrap();
        assert_eq!(server.store().config().watch_capacity, 7);
        assert_eq!(server.config().watch_capacity, 7);
    }
}
