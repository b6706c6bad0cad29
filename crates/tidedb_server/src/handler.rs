//! Request dispatch onto a [`Store`].

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::route::{Method, Route};
use serde::Deserialize;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use tidedb_codec::Value;
use tidedb_core::{IndexConfig, Store};
use tracing::{debug, warn};

/// An incoming request, already stripped of its transport.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request path, optionally with a query string.
    pub path: String,
    /// Raw JSON body; empty when the route takes none.
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a request.
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method,
            path: path.into(),
            body: body.into(),
        }
    }

    /// Creates a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, Vec::new())
    }

    /// Creates a `PUT` request.
    pub fn put(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Put, path, body)
    }

    /// Creates a `POST` request.
    pub fn post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(Method::Post, path, body)
    }

    /// Creates a `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, Vec::new())
    }
}

/// Outcome of a request.
#[derive(Debug)]
pub enum Response {
    /// A single JSON document with its status code.
    Json(u16, serde_json::Value),
    /// A live watch; every item is one JSON message.
    Stream(WatchStream),
}

impl Response {
    /// Status code of the response. Streams are always `200`.
    pub fn status(&self) -> u16 {
        match self {
            Response::Json(status, _) => *status,
            Response::Stream(_) => 200,
        }
    }

    fn ok(body: serde_json::Value) -> Self {
        Response::Json(200, body)
    }

    fn no_content() -> Self {
        Response::Json(204, serde_json::Value::Null)
    }

    fn error(err: &ServerError) -> Self {
        Response::Json(err.status(), serde_json::json!({ "error": err.to_string() }))
    }
}

/// Messages of a document or index watch, converted to JSON.
///
/// The stream ends when the watch is closed: the document was deleted, the
/// index was dropped, the store was closed, or the consumer fell too far
/// behind.
#[derive(Debug)]
pub enum WatchStream {
    /// Successive values of one document; `null` once deleted.
    Document(Receiver<Value>),
    /// Successive key lists posted under one index value.
    Index(Receiver<Vec<String>>),
}

impl WatchStream {
    /// Blocks for the next message, or `None` once the watch has closed.
    pub fn recv(&self) -> Option<ServerResult<serde_json::Value>> {
        match self {
            WatchStream::Document(rx) => rx.recv().ok().map(|v| document_json(&v)),
            WatchStream::Index(rx) => rx.recv().ok().map(|keys| Ok(keys_json(keys))),
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// `Timeout` when nothing arrived in time, `Disconnected` once the
    /// watch has closed.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ServerResult<serde_json::Value>, RecvTimeoutError> {
        match self {
            WatchStream::Document(rx) => rx.recv_timeout(timeout).map(|v| document_json(&v)),
            WatchStream::Index(rx) => rx.recv_timeout(timeout).map(|keys| Ok(keys_json(keys))),
        }
    }
}

impl Iterator for WatchStream {
    type Item = ServerResult<serde_json::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Body of a create-index request. Field names match case-insensitively
/// enough to accept both `unique` and `Unique`.
#[derive(Debug, Default, Deserialize)]
struct IndexConfigBody {
    #[serde(default, alias = "Unique")]
    unique: bool,
    #[serde(default, alias = "Exclude")]
    exclude: Vec<serde_json::Value>,
}

impl From<IndexConfigBody> for IndexConfig {
    fn from(body: IndexConfigBody) -> Self {
        body.exclude
            .into_iter()
            .fold(IndexConfig::new().unique(body.unique), |config, value| {
                config.exclude(Value::from_json(value))
            })
    }
}

fn document_json(value: &Value) -> ServerResult<serde_json::Value> {
    Ok(value.to_json()?)
}

fn keys_json(keys: Vec<String>) -> serde_json::Value {
    serde_json::Value::Array(keys.into_iter().map(serde_json::Value::String).collect())
}

/// Maps requests onto store operations.
pub struct RequestHandler {
    store: Arc<Store>,
    max_body_size: usize,
}

impl RequestHandler {
    /// Creates a handler serving `store`.
    pub fn new(store: Arc<Store>, config: &ServerConfig) -> Self {
        Self {
            store,
            max_body_size: config.max_body_size,
        }
    }

    /// Handles a request. Failures become JSON error responses carrying the
    /// error's status code.
    pub fn handle(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                if err.is_client_error() {
                    debug!(method = %request.method, path = %request.path, error = %err, "request rejected");
                } else {
                    warn!(method = %request.method, path = %request.path, error = %err, "request failed");
                }
                Response::error(&err)
            }
        }
    }

    fn dispatch(&self, request: &Request) -> ServerResult<Response> {
        let route = Route::resolve(request.method, &request.path)?;
        debug!(method = %request.method, ?route, "dispatching");

        let body = if route.has_body() {
            self.body(request)?
        } else {
            serde_json::Value::Null
        };

        match route {
            Route::Read { collection, key } => {
                let value = self.store.read(&collection, &key)?;
                let json = match value {
                    Some(value) => value.to_json()?,
                    None => serde_json::Value::Null,
                };
                Ok(Response::ok(json))
            }
            Route::Write { collection, key } => {
                self.store.write(&collection, &key, &Value::from_json(body))?;
                Ok(Response::no_content())
            }
            Route::Delete { collection, key } => {
                self.store.delete(&collection, &key)?;
                Ok(Response::no_content())
            }
            Route::Watch { collection, key } => Ok(Response::Stream(WatchStream::Document(
                self.store.watch(&collection, &key)?,
            ))),
            Route::QueryIndex { collection, index } => {
                let keys = self
                    .store
                    .query_index(&collection, &index, &Value::from_json(body))?;
                Ok(Response::ok(keys_json(keys)))
            }
            Route::CreateIndex { collection, index } => {
                let config: IndexConfigBody = if body.is_null() {
                    IndexConfigBody::default()
                } else {
                    serde_json::from_value(body)?
                };
                self.store.create_index(&collection, &index, config.into())?;
                Ok(Response::Json(201, serde_json::Value::Null))
            }
            Route::DeleteIndex { collection, index } => {
                self.store.delete_index(&collection, &index)?;
                Ok(Response::no_content())
            }
            Route::WatchIndex { collection, index } => Ok(Response::Stream(WatchStream::Index(
                self.store
                    .watch_index(&collection, &index, &Value::from_json(body))?,
            ))),
        }
    }

    fn body(&self, request: &Request) -> ServerResult<serde_json::Value> {
        if request.body.len() > self.max_body_size {
            return Err(ServerError::InvalidRequest(format!(
                "body of {} bytes exceeds limit of {}",
                request.body.len(),
                self.max_body_size
            )));
        }
        if request.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_slice(&request.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_handler() -> RequestHandler {
        let store = Arc::new(Store::open_in_memory().unwrap());
        RequestHandler::new(store, &ServerConfig::default().with_max_body_size(64))
    }

    fn json_body(response: Response) -> (u16, serde_json::Value) {
        match response {
            Response::Json(status, body) => (status, body),
            Response::Stream(_) => panic!("expected a json response"),
        }
    }

    #[test]
    fn write_then_read() {
        let handler = create_handler();
        let put = handler.handle(&Request::put("/t/data/a", r#"{"b":"c","n":1}"#));
        assert_eq!(put.status(), 204);

        let (status, body) = json_body(handler.handle(&Request::get("/t/data/a")));
        assert_eq!(status, 200);
        assert_eq!(body, json!({"b": "c", "n": 1}));
    }

    #[test]
    fn missing_document_reads_null() {
        let handler = create_handler();
        let (status, body) = json_body(handler.handle(&Request::get("/t/data/nope")));
        assert_eq!(status, 200);
        assert!(body.is_null());
    }

    #[test]
    fn delete_document() {
        let handler = create_handler();
        handler.handle(&Request::put("/t/data/a", "1"));
        assert_eq!(handler.handle(&Request::delete("/t/data/a")).status(), 204);
        let (_, body) = json_body(handler.handle(&Request::get("/t/data/a")));
        assert!(body.is_null());
    }

    #[test]
    fn create_and_query_index() {
        let handler = create_handler();
        let created = handler.handle(&Request::put("/t/index/b", r#"{"unique":false}"#));
        assert_eq!(created.status(), 201);
        handler.handle(&Request::put("/t/data/a", r#"{"b":"c"}"#));
        handler.handle(&Request::put("/t/data/z", r#"{"b":"c"}"#));

        let (status, body) = json_body(handler.handle(&Request::post("/t/index/b/query", r#""c""#)));
        assert_eq!(status, 200);
        assert_eq!(body, json!(["a", "z"]));
    }

    #[test]
    fn create_index_accepts_capitalized_fields_and_empty_body() {
        let handler = create_handler();
        let created = handler.handle(&Request::post(
            "/t/index/b",
            r#"{"Unique":true,"Exclude":[""]}"#,
        ));
        assert_eq!(created.status(), 201);
        assert_eq!(handler.handle(&Request::put("/t/index/c", "")).status(), 201);

        handler.handle(&Request::put("/t/data/a", r#"{"b":""}"#));
        handler.handle(&Request::put("/t/data/z", r#"{"b":""}"#));
        let (_, body) = json_body(handler.handle(&Request::post("/t/index/b/query", r#""""#)));
        assert_eq!(body, json!([]));
    }

    #[test]
    fn unique_overlap_is_conflict() {
        let handler = create_handler();
        handler.handle(&Request::put("/t/index/b", r#"{"unique":true}"#));
        handler.handle(&Request::put("/t/data/a", r#"{"b":"c"}"#));

        let (status, body) = json_body(handler.handle(&Request::put("/t/data/z", r#"{"b":"c"}"#)));
        assert_eq!(status, 409);
        assert!(body["error"].as_str().unwrap().contains('a'));
    }

    #[test]
    fn unknown_index_is_not_found() {
        let handler = create_handler();
        let query = handler.handle(&Request::post("/t/index/missing/query", "1"));
        assert_eq!(query.status(), 404);
        assert_eq!(handler.handle(&Request::post("/t/index/missing/watch", "1")).status(), 404);
    }

    #[test]
    fn delete_index_of_unknown_name_succeeds() {
        let handler = create_handler();
        assert_eq!(handler.handle(&Request::delete("/t/index/none")).status(), 204);
    }

    #[test]
    fn bad_requests() {
        let handler = create_handler();
        assert_eq!(handler.handle(&Request::put("/t/data/a", "{nope")).status(), 400);
        assert_eq!(handler.handle(&Request::put("/t/index/b", r#"{"unique":"yes"}"#)).status(), 400);
        assert_eq!(handler.handle(&Request::get("/t/data/%zz")).status(), 400);
        let large = format!("\"{}\"", "x".repeat(100));
        assert_eq!(handler.handle(&Request::put("/t/data/a", large)).status(), 400);
        assert_eq!(handler.handle(&Request::get("/t/nothing/a")).status(), 404);
        assert_eq!(handler.handle(&Request::get("/t/index/b")).status(), 405);
    }

    #[test]
    fn document_watch_streams_json() {
        let handler = create_handler();
        let response = handler.handle(&Request::get("/t/data/a/watch"));
        assert_eq!(response.status(), 200);
        let Response::Stream(stream) = response else {
            panic!("expected a stream");
        };
        assert!(stream.recv().unwrap().unwrap().is_null());

        handler.handle(&Request::put("/t/data/a", r#"{"b":"c"}"#));
        assert_eq!(stream.recv().unwrap().unwrap(), json!({"b": "c"}));

        handler.handle(&Request::delete("/t/data/a"));
        assert!(stream.recv().unwrap().unwrap().is_null());
        assert!(stream.recv().is_none());
    }

    #[test]
    fn index_watch_streams_key_lists() {
        let handler = create_handler();
        handler.handle(&Request::put("/t/index/b", "{}"));
        let Response::Stream(stream) = handler.handle(&Request::post("/t/index/b/watch", r#""c""#))
        else {
            panic!("expected a stream");
        };
        assert_eq!(stream.recv().unwrap().unwrap(), json!([]));
        assert_eq!(
            stream.recv_timeout(Duration::from_millis(10)).unwrap_err(),
            RecvTimeoutError::Timeout
        );

        handler.handle(&Request::put("/t/data/a", r#"{"b":"c"}"#));
        handler.handle(&Request::delete("/t/index/b"));

        let rest: Vec<_> = stream.map(|r| r.unwrap()).collect();
        assert_eq!(rest, vec![json!(["a"])]);
    }
}
