//! Store configuration.

/// Default number of undelivered notifications a watch may hold before it
/// is evicted.
pub const DEFAULT_WATCH_CAPACITY: usize = 5;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,

    /// Queue depth of each watch subscription.
    pub watch_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the watch queue depth. A capacity of zero is raised to one so
    /// that the initial snapshot always fits.
    #[must_use]
    pub const fn watch_capacity(mut self, capacity: usize) -> Self {
        self.watch_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }
}
