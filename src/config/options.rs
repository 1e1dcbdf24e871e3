//! Immutable probe configuration.
//!
//! A [`ProbeConfig`] is built once (see [`ProbeConfigBuilder`]) and handed to
//! each component at construction. Nothing reads global settings.
//!
//! [`ProbeConfigBuilder`]: super::ProbeConfigBuilder

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

pub use crate::transport::DEFAULT_COMMAND_TIMEOUT;

use super::builder::ProbeConfigBuilder;

// ============================================================================
// Defaults
// ============================================================================

/// Default remote-debugging HTTP endpoint.
pub const DEFAULT_DEBUG_BASE: &str = "http://localhost:9222";

/// Default number of discovery polls.
pub const DEFAULT_DISCOVERY_ATTEMPTS: u32 = 15;

/// Default spacing between discovery polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Title substring identifying the application's main window.
pub const DEFAULT_PREFERRED_TITLE: &str = "TeamSpeak Client UI";

/// Default wall-clock window for collecting parsed-script events.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(5);

/// Default per-read timeout inside the scan window.
pub const DEFAULT_SCAN_POLL: Duration = Duration::from_millis(100);

/// Default timeout for one script-source request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default wait for the load event after a reload.
pub const DEFAULT_RELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Default output root for dumped files.
pub const DEFAULT_OUTPUT_ROOT: &str = "dumps";

// ============================================================================
// ProbeConfig
// ============================================================================

/// Validated configuration shared by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub(super) debug_base: Url,
    pub(super) discovery_attempts: u32,
    pub(super) poll_interval: Duration,
    pub(super) preferred_title: Option<String>,
    pub(super) command_timeout: Duration,
    pub(super) scan_window: Duration,
    pub(super) scan_poll: Duration,
    pub(super) fetch_timeout: Duration,
    pub(super) reload_timeout: Duration,
    pub(super) output_root: PathBuf,
}

impl ProbeConfig {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ProbeConfigBuilder {
        ProbeConfigBuilder::new()
    }

    /// Remote-debugging HTTP base, e.g. `http://localhost:9222`.
    #[inline]
    #[must_use]
    pub fn debug_base(&self) -> &Url {
        &self.debug_base
    }

    /// The `<base>/json` target-list endpoint.
    #[must_use]
    pub fn json_endpoint(&self) -> String {
        format!("{}/json", self.debug_base.as_str().trim_end_matches('/'))
    }

    /// Number of discovery polls before giving up.
    #[inline]
    #[must_use]
    pub const fn discovery_attempts(&self) -> u32 {
        self.discovery_attempts
    }

    /// Time budget of one discovery poll.
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Title substring preferred when selecting a target.
    #[inline]
    #[must_use]
    pub fn preferred_title(&self) -> Option<&str> {
        self.preferred_title.as_deref()
    }

    /// Timeout for ordinary commands.
    #[inline]
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Wall-clock window of script collection.
    #[inline]
    #[must_use]
    pub const fn scan_window(&self) -> Duration {
        self.scan_window
    }

    /// Per-read timeout inside the scan window.
    #[inline]
    #[must_use]
    pub const fn scan_poll(&self) -> Duration {
        self.scan_poll
    }

    /// Timeout for one script-source request.
    #[inline]
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Wait for the load event after a reload.
    #[inline]
    #[must_use]
    pub const fn reload_timeout(&self) -> Duration {
        self.reload_timeout
    }

    /// Root directory for dumped files.
    #[inline]
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}

// ============================================================================
// Tests
// ============================================================================
