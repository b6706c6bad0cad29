//! Server configuration.

use std::path::PathBuf;
use tidedb_core::DEFAULT_WATCH_CAPACITY;

/// Configuration for a TideDB server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Database file.
    pub db_path: PathBuf,
    /// Queue depth of every watch opened through the router.
    pub watch_capacity: usize,
    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl ServerConfig {
    /// Creates a configuration serving the database at `db_path`.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            watch_capacity: DEFAULT_WATCH_CAPACITY,
            max_body_size: 1024 * 1024,
        }
    }

    /// Sets the watch queue depth.
    #[must_use]
    pub fn with_watch_capacity(mut self, capacity: usize) -> Self {
        self.watch_capacity = capacity;
        self
    }

    /// Sets the maximum request body size.
    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("server.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.db_path, PathBuf::from("server.db"));
        assert_eq!(config.watch_capacity, DEFAULT_WATCH_CAPACITY);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("/tmp/x.redb")
            .with_watch_capacity(4)
            .with_max_body_size(10);

        assert_eq!(config.db_path, PathBuf::from("/tmp/x.redb"));
        assert_eq!(config.watch_capacity, 4);
        assert_eq!(config.max_body_size, 10);
    }
}
