//! Configuration for fobos-link
//!
//! Centralized link configuration with the controller's factory defaults.

use std::time::Duration;

use crate::error::{FobosError, Result};

/// Configuration for a single controller link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    // -------------------------------------------------------------------------
    // Exchange Configuration
    // -------------------------------------------------------------------------
    /// How long a request waits for its response before resolving `Timeout`
    pub response_timeout: Duration,

    /// How long a facade call waits for its turn on the single request slot
    pub acquire_timeout: Duration,

    // -------------------------------------------------------------------------
    // Supervision Configuration
    // -------------------------------------------------------------------------
    /// Echo cadence required by the controller
    pub echo_interval: Duration,

    /// Consecutive timeouts after which an alive link is declared stale
    pub stale_after_misses: u32,

    /// Start the periodic echo supervisor when the link opens
    pub supervise: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Socket write timeout
    pub write_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(100),
            acquire_timeout: Duration::from_millis(250),
            echo_interval: Duration::from_millis(250),
            stale_after_misses: 1,
            supervise: true,
            connect_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_millis(100),
        }
    }
}

impl LinkConfig {
    /// Create a new config builder
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::default()
    }

    /// Reject settings the link cannot run with
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("response_timeout", self.response_timeout),
            ("acquire_timeout", self.acquire_timeout),
            ("echo_interval", self.echo_interval),
            ("connect_timeout", self.connect_timeout),
            ("write_timeout", self.write_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(FobosError::Config(format!("{} must be non-zero", name)));
            }
        }

        if self.stale_after_misses == 0 {
            return Err(FobosError::Config(
                "stale_after_misses must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for LinkConfig
#[derive(Default)]
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    /// Set the per-request response timeout
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Set how long facade calls wait for the request slot
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Set the echo cadence
    pub fn echo_interval(mut self, interval: Duration) -> Self {
        self.config.echo_interval = interval;
        self
    }

    /// Set the consecutive-miss threshold for staleness
    pub fn stale_after_misses(mut self, misses: u32) -> Self {
        self.config.stale_after_misses = misses;
        self
    }

    /// Enable or disable the periodic echo supervisor
    pub fn supervise(mut self, enabled: bool) -> Self {
        self.config.supervise = enabled;
        self
    }

    /// Set the TCP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the socket write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn build(self) -> LinkConfig {
        self.config
    }
}
