//! Builder pattern for probe configuration.
//!
//! Provides a fluent API for configuring and validating a [`ProbeConfig`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use cef_probe::ProbeConfig;
//!
//! # fn example() -> cef_probe::Result<()> {
//! let config = ProbeConfig::builder()
//!     .port(9222)
//!     .scan_window(Duration::from_secs(10))
//!     .output_root("./dumps")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::options::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_DEBUG_BASE, DEFAULT_DISCOVERY_ATTEMPTS,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_OUTPUT_ROOT, DEFAULT_POLL_INTERVAL, DEFAULT_PREFERRED_TITLE,
    DEFAULT_RELOAD_TIMEOUT, DEFAULT_SCAN_POLL, DEFAULT_SCAN_WINDOW, ProbeConfig,
};

// ============================================================================
// ProbeConfigBuilder
// ============================================================================

/// Builder for a [`ProbeConfig`].
///
/// Use [`ProbeConfig::builder()`] to create a new builder. Unset fields take
/// their documented defaults.
#[derive(Debug, Default, Clone)]
pub struct ProbeConfigBuilder {
    debug_base: Option<String>,
    discovery_attempts: Option<u32>,
    poll_interval: Option<Duration>,
    preferred_title: Option<Option<String>>,
    command_timeout: Option<Duration>,
    scan_window: Option<Duration>,
    scan_poll: Option<Duration>,
    fetch_timeout: Option<Duration>,
    reload_timeout: Option<Duration>,
    output_root: Option<PathBuf>,
}

// ============================================================================
// ProbeConfigBuilder Implementation
// ============================================================================

impl ProbeConfigBuilder {
    /// Creates a new builder with no overrides.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote-debugging HTTP base URL.
    #[inline]
    #[must_use]
    pub fn debug_base(mut self, url: impl Into<String>) -> Self {
        self.debug_base = Some(url.into());
        self
    }

    /// Sets the base URL to `http://localhost:<port>`.
    #[inline]
    #[must_use]
    pub fn port(self, port: u16) -> Self {
        self.debug_base(format!("http://localhost:{port}"))
    }

    /// Sets the number of discovery polls.
    #[inline]
    #[must_use]
    pub fn discovery_attempts(mut self, attempts: u32) -> Self {
        self.discovery_attempts = Some(attempts);
        self
    }

    /// Sets the time budget of one discovery poll.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sets the preferred target-title substring.
    #[inline]
    #[must_use]
    pub fn preferred_title(mut self, title: impl Into<String>) -> Self {
        self.preferred_title = Some(Some(title.into()));
        self
    }

    /// Selects the first page target regardless of title.
    #[inline]
    #[must_use]
    pub fn no_preferred_title(mut self) -> Self {
        self.preferred_title = Some(None);
        self
    }

    /// Sets the timeout for ordinary commands.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Sets the script-collection window.
    #[inline]
    #[must_use]
    pub fn scan_window(mut self, window: Duration) -> Self {
        self.scan_window = Some(window);
        self
    }

    /// Sets the per-read timeout inside the scan window.
    #[inline]
    #[must_use]
    pub fn scan_poll(mut self, poll: Duration) -> Self {
        self.scan_poll = Some(poll);
        self
    }

    /// Sets the timeout for one script-source request.
    #[inline]
    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the wait for the load event after a reload.
    #[inline]
    #[must_use]
    pub fn reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = Some(timeout);
        self
    }

    /// Sets the output root for dumped files.
    #[inline]
    #[must_use]
    pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the debug base does not parse
    /// - [`Error::Config`] if the debug base is not `http`/`https`
    /// - [`Error::Config`] if a count or duration is zero
    /// - [`Error::Config`] if the scan poll exceeds the scan window
    pub fn build(self) -> Result<ProbeConfig> {
        let debug_base = self.validate_debug_base()?;
        let discovery_attempts = self.discovery_attempts.unwrap_or(DEFAULT_DISCOVERY_ATTEMPTS);
        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        let command_timeout = self.command_timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT);
        let scan_window = self.scan_window.unwrap_or(DEFAULT_SCAN_WINDOW);
        let scan_poll = self.scan_poll.unwrap_or(DEFAULT_SCAN_POLL);
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);
        let reload_timeout = self.reload_timeout.unwrap_or(DEFAULT_RELOAD_TIMEOUT);

        if discovery_attempts == 0 {
            return Err(Error::config("discovery attempts must be at least 1"));
        }

        for (name, value) in [
            ("poll interval", poll_interval),
            ("command timeout", command_timeout),
            ("scan poll", scan_poll),
            ("fetch timeout", fetch_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        if scan_poll > scan_window {
            return Err(Error::config(format!(
                "scan poll ({scan_poll:?}) must not exceed scan window ({scan_window:?})"
            )));
        }

        Ok(ProbeConfig {
            debug_base,
            discovery_attempts,
            poll_interval,
            preferred_title: self
                .preferred_title
                .unwrap_or_else(|| Some(DEFAULT_PREFERRED_TITLE.to_string())),
            command_timeout,
            scan_window,
            scan_poll,
            fetch_timeout,
            reload_timeout,
            output_root: self
                .output_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT)),
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ProbeConfigBuilder {
    /// Validates the debug base URL.
    fn validate_debug_base(&self) -> Result<Url> {
        let raw = self.debug_base.as_deref().unwrap_or(DEFAULT_DEBUG_BASE);
        let url = Url::parse(raw)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "debug base must be an http(s) URL, got: {raw}\n\
                 Example: ProbeConfig::builder().debug_base(\"http://localhost:9222\")"
            )));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================
