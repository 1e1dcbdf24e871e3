//! Sequential script-source download.
//!
//! [`ResourceFetcher`] walks a [`ScriptCatalog`], requests each script's
//! source with `Debugger.getScriptSource` and hands the text to a
//! [`SourceSink`] at the sanitized path of its locator.
//!
//! # Request Ids
//!
//! A numeric script id `n` is requested with id `RESERVED_ID_BASE + n`, a
//! range the connection counter never enters. Other script ids, and numeric
//! ids whose derived id would not fit in an `i32`, use a counter id.
//!
//! # Failure Handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Protocol error, timeout, missing source | Recorded, next item |
//! | Sink write error | Recorded, next item |
//! | Empty source | Skipped |
//! | Transport failure | Batch aborted |

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::catalog::ScriptCatalog;
use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::identifiers::{RequestId, ScriptId};
use crate::protocol::{Command, DebuggerCommand};
use crate::sanitize::sanitize;
use crate::transport::{Connection, Transport};

// ============================================================================
// SourceSink
// ============================================================================

/// Destination for fetched script sources.
pub trait SourceSink {
    /// Stores `source` under the relative path `relative`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be stored.
    fn store(&mut self, relative: &Path, source: &str) -> Result<()>;
}

/// Writes sources below a root directory, creating parents as needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`.
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceSink for DirectorySink {
    fn store(&mut self, relative: &Path, source: &str) -> Result<()> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, source)?;
        debug!(path = %path.display(), bytes = source.len(), "Source saved");
        Ok(())
    }
}

// ============================================================================
// FetchReport
// ============================================================================

/// A script whose source could not be saved.
#[derive(Debug)]
pub struct FetchFailure {
    /// Script id.
    pub script_id: ScriptId,
    /// Script locator.
    pub locator: String,
    /// What went wrong.
    pub error: Error,
}

/// Outcome of [`ResourceFetcher::fetch_all`].
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Sources handed to the sink.
    pub saved: usize,
    /// Sources skipped because they were empty.
    pub skipped: usize,
    /// Per-item failures.
    pub failures: Vec<FetchFailure>,
    /// Transport failure that ended the batch early.
    pub aborted: Option<Error>,
}

impl FetchReport {
    /// Returns `true` if every item was processed.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    /// Number of items processed.
    #[inline]
    #[must_use]
    pub fn processed(&self) -> usize {
        self.saved + self.skipped + self.failures.len()
    }
}

// ============================================================================
// ResourceFetcher
// ============================================================================

/// Downloads script sources over a control connection.
#[derive(Debug, Clone, Copy)]
pub struct ResourceFetcher {
    timeout: Duration,
}

impl ResourceFetcher {
    /// Creates a fetcher with the given per-script timeout.
    #[inline]
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Creates a fetcher using the configured fetch timeout.
    #[inline]
    #[must_use]
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.fetch_timeout())
    }

    /// Fetches the source of one script.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the debugger rejects the request
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the result has no `scriptSource`
    /// - connection errors if the channel fails
    pub async fn fetch<T: Transport>(
        &self,
        connection: &mut Connection<T>,
        script_id: &ScriptId,
    ) -> Result<String> {
        let command = Command::Debugger(DebuggerCommand::GetScriptSource {
            script_id: script_id.clone(),
        });
        let method = command.method();

        let response = match RequestId::for_script(script_id) {
            Some(id) => {
                connection
                    .send_and_await_with_id(id, command, self.timeout)
                    .await?
            }
            None => connection.send_and_await(command, self.timeout).await?,
        };

        response
            .into_result(method)?
            .get("scriptSource")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::protocol(format!("no scriptSource for script {script_id}")))
    }

    /// Fetches every cataloged script into `sink`.
    ///
    /// Never fails as a whole: per-item failures and a batch-ending
    /// transport failure are reported in the returned [`FetchReport`].
    pub async fn fetch_all<T: Transport, S: SourceSink>(
        &self,
        connection: &mut Connection<T>,
        catalog: &ScriptCatalog,
        sink: &mut S,
    ) -> FetchReport {
        let mut report = FetchReport::default();
        let total = catalog.len();

        for (index, record) in catalog.iter().enumerate() {
            let relative = sanitize(&record.locator);
            info!(
                item = index + 1,
                total,
                url = %record.locator,
                path = %relative.display(),
                "Downloading"
            );

            let source = match self.fetch(connection, &record.script_id).await {
                Ok(source) => source,
                Err(e) if e.is_connection_error() => {
                    error!(error = %e, remaining = total - index, "Fetch aborted");
                    report.aborted = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(script_id = %record.script_id, error = %e, "Fetch failed");
                    report.failures.push(FetchFailure {
                        script_id: record.script_id.clone(),
                        locator: record.locator.clone(),
                        error: e,
                    });
                    continue;
                }
            };

            if source.is_empty() {
                debug!(script_id = %record.script_id, "Empty source skipped");
                report.skipped += 1;
                continue;
            }

            match sink.store(&relative, &source) {
                Ok(()) => report.saved += 1,
                Err(e) => {
                    warn!(path = %relative.display(), error = %e, "Saving source failed");
                    report.failures.push(FetchFailure {
                        script_id: record.script_id.clone(),
                        locator: record.locator.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            saved = report.saved,
            skipped = report.skipped,
            failed = report.failures.len(),
            complete = report.is_complete(),
            "Download finished"
        );
        report
    }
}

// ============================================================================
// Tests
// ============================================================================
