//! Runtime configuration.

use std::time::Duration;

/// Timing and startup behaviour of the polling loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Sleep between two steady-state cycles.
    pub poll_interval: Duration,
    /// Delay before priming, while the HTTP server comes up.
    pub warmup: Duration,
    /// Upsert every existing sheet row into the catalogue during priming.
    pub sync_products_on_start: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            warmup: Duration::from_secs(10),
            sync_products_on_start: false,
        }
    }
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the warm-up delay.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Enables or disables the startup catalogue sync.
    pub fn with_sync_products_on_start(mut self, enabled: bool) -> Self {
        self.sync_products_on_start = enabled;
        self
    }
}
