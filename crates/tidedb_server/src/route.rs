//! Path and method matching.
//!
//! Every route has the shape `{collection}/{data|index}/{name}[/{action}]`.
//! Segments are split on `/` first and percent-decoded afterwards, so an
//! encoded slash stays inside its segment.

use crate::error::{ServerError, ServerResult};
use std::fmt;
use std::str::FromStr;

/// Request method understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl FromStr for Method {
    type Err = ServerError;

    fn from_str(s: &str) -> ServerResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            _ => Err(ServerError::InvalidRequest(format!("unsupported method {s}"))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// A matched route with its decoded path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET {collection}/data/{key}`
    Read {
        /// Collection name.
        collection: String,
        /// Document key.
        key: String,
    },
    /// `PUT|POST {collection}/data/{key}`
    Write {
        /// Collection name.
        collection: String,
        /// Document key.
        key: String,
    },
    /// `DELETE {collection}/data/{key}`
    Delete {
        /// Collection name.
        collection: String,
        /// Document key.
        key: String,
    },
    /// `GET {collection}/data/{key}/watch`
    Watch {
        /// Collection name.
        collection: String,
        /// Document key.
        key: String,
    },
    /// `POST {collection}/index/{index}/query`
    QueryIndex {
        /// Collection name.
        collection: String,
        /// Index name.
        index: String,
    },
    /// `PUT|POST {collection}/index/{index}`
    CreateIndex {
        /// Collection name.
        collection: String,
        /// Index name.
        index: String,
    },
    /// `DELETE {collection}/index/{index}`
    DeleteIndex {
        /// Collection name.
        collection: String,
        /// Index name.
        index: String,
    },
    /// `POST {collection}/index/{index}/watch`
    WatchIndex {
        /// Collection name.
        collection: String,
        /// Index name.
        index: String,
    },
}

impl Route {
    /// Matches `method` and `path` against the route table.
    ///
    /// A query string is ignored, as are leading and trailing slashes.
    ///
    /// # Errors
    ///
    /// `RouteNotFound` when no pattern matches the path, `MethodNotAllowed`
    /// when one does but not for `method`, and `InvalidRequest` for a
    /// malformed percent escape.
    pub fn resolve(method: Method, path: &str) -> ServerResult<Self> {
        let raw = path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = raw.trim_matches('/').split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ServerError::RouteNotFound(path.to_string()));
        }

        let not_allowed = || ServerError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
        };

        match segments.as_slice() {
            [collection, "data", key] => {
                let (collection, key) = (percent_decode(collection)?, percent_decode(key)?);
                match method {
                    Method::Get => Ok(Route::Read { collection, key }),
                    Method::Put | Method::Post => Ok(Route::Write { collection, key }),
                    Method::Delete => Ok(Route::Delete { collection, key }),
                }
            }
            [collection, "data", key, "watch"] => match method {
                Method::Get => Ok(Route::Watch {
                    collection: percent_decode(collection)?,
                    key: percent_decode(key)?,
                }),
                _ => Err(not_allowed()),
            },
            [collection, "index", index] => {
                let (collection, index) = (percent_decode(collection)?, percent_decode(index)?);
                match method {
                    Method::Put | Method::Post => Ok(Route::CreateIndex { collection, index }),
                    Method::Delete => Ok(Route::DeleteIndex { collection, index }),
                    Method::Get => Err(not_allowed()),
                }
            }
            [collection, "index", index, action @ ("query" | "watch")] => {
                if method != Method::Post {
                    return Err(not_allowed());
                }
                let (collection, index) = (percent_decode(collection)?, percent_decode(index)?);
                Ok(if *action == "query" {
                    Route::QueryIndex { collection, index }
                } else {
                    Route::WatchIndex { collection, index }
                })
            }
            _ => Err(ServerError::RouteNotFound(path.to_string())),
        }
    }

    /// Whether the route takes a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(
            self,
            Route::Write { .. }
                | Route::QueryIndex { .. }
                | Route::CreateIndex { .. }
                | Route::WatchIndex { .. }
        )
    }
}

/// Decodes `%XX` escapes in a single path segment.
///
/// # Errors
///
/// Returns `InvalidRequest` for a truncated or non-hex escape, or when the
/// decoded bytes are not UTF-8.
pub fn percent_decode(segment: &str) -> ServerResult<String> {
    if !segment.contains('%') {
        return Ok(segment.to_string());
    }
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| {
                    ServerError::InvalidRequest(format!("bad percent escape in {segment}"))
                })?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| ServerError::InvalidRequest(format!("segment {segment} is not utf-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(method: Method, path: &str) -> Route {
        Route::resolve(method, path).unwrap()
    }

    #[test]
    fn data_routes() {
        let read = resolve(Method::Get, "/users/data/alice");
        assert_eq!(
            read,
            Route::Read {
                collection: "users".into(),
                key: "alice".into()
            }
        );
        assert!(matches!(resolve(Method::Put, "users/data/alice"), Route::Write { .. }));
        assert!(matches!(resolve(Method::Post, "users/data/alice/"), Route::Write { .. }));
        assert!(matches!(resolve(Method::Delete, "/users/data/alice"), Route::Delete { .. }));
        assert!(matches!(resolve(Method::Get, "/users/data/alice/watch"), Route::Watch { .. }));
    }

    #[test]
    fn index_routes() {
        assert!(matches!(resolve(Method::Put, "/t/index/b"), Route::CreateIndex { .. }));
        assert!(matches!(resolve(Method::Post, "/t/index/b"), Route::CreateIndex { .. }));
        assert!(matches!(resolve(Method::Delete, "/t/index/b"), Route::DeleteIndex { .. }));
        assert!(matches!(resolve(Method::Post, "/t/index/b/query"), Route::QueryIndex { .. }));
        assert_eq!(
            resolve(Method::Post, "/t/index/b/watch"),
            Route::WatchIndex {
                collection: "t".into(),
                index: "b".into()
            }
        );
    }

    #[test]
    fn wrong_method_is_not_allowed() {
        for (method, path) in [
            (Method::Post, "/t/data/a/watch"),
            (Method::Get, "/t/index/b"),
            (Method::Get, "/t/index/b/query"),
            (Method::Put, "/t/index/b/watch"),
        ] {
            let err = Route::resolve(method, path).unwrap_err();
            assert!(matches!(err, ServerError::MethodNotAllowed { .. }), "{method} {path}");
            assert_eq!(err.status(), 405);
        }
    }

    #[test]
    fn unknown_paths() {
        for path in ["/", "/t", "/t/data", "/t/other/a", "/t//a", "/t/data/a/b/c", "/t/index/b/drop"] {
            let err = Route::resolve(Method::Get, path).unwrap_err();
            assert!(matches!(err, ServerError::RouteNotFound(_)), "{path}");
        }
    }

    #[test]
    fn segments_are_decoded_after_splitting() {
        assert_eq!(
            resolve(Method::Get, "/my%20docs/data/a%2Fb?pretty=1"),
            Route::Read {
                collection: "my docs".into(),
                key: "a/b".into()
            }
        );
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("plain").unwrap(), "plain");
        assert_eq!(percent_decode("caf%C3%A9").unwrap(), "café");
        assert_eq!(percent_decode("%2e%2E").unwrap(), "..");
        assert!(percent_decode("bad%2").is_err());
        assert!(percent_decode("bad%zz").is_err());
        assert!(percent_decode("%FF").is_err());
    }

    #[test]
    fn method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("PATCH".parse::<Method>().is_err());
        assert_eq!(Method::Post.to_string(), "POST");
    }
}
