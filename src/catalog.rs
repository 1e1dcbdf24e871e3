//! Script catalog built from `Debugger.scriptParsed` events.
//!
//! Enabling the `Debugger` domain makes the renderer replay one
//! `scriptParsed` event per loaded script. [`ScriptCatalog::collect`] drains
//! the event sink for a fixed window and records every script that has a
//! locator.
//!
//! The window is a heuristic: the protocol has no "replay finished" marker,
//! so scripts announced after the window closes are missed.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::identifiers::ScriptId;
use crate::protocol::{Domain, Event, ParsedEvent};
use crate::transport::{Connection, Transport};

// ============================================================================
// ScriptRecord
// ============================================================================

/// A parsed script and where it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    /// Debugger-assigned id.
    pub script_id: ScriptId,
    /// Script locator.
    pub locator: String,
}

// ============================================================================
// ScriptCatalog
// ============================================================================

/// Scripts keyed by id, in first-seen order.
///
/// Re-announcing an id replaces its locator and keeps its position.
#[derive(Debug, Default, Clone)]
pub struct ScriptCatalog {
    records: Vec<ScriptRecord>,
    index: FxHashMap<ScriptId, usize>,
}

impl ScriptCatalog {
    /// Creates an empty catalog.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the `Debugger` domain and records parsed scripts for `window`.
    ///
    /// Each read waits at most `poll`. A transport failure ends collection
    /// early and keeps what was gathered.
    ///
    /// # Errors
    ///
    /// Returns an error only if `Debugger.enable` fails.
    pub async fn collect<T: Transport>(
        connection: &mut Connection<T>,
        window: Duration,
        poll: Duration,
    ) -> Result<Self> {
        connection.enable(Domain::Debugger).await?;

        let mut catalog = Self::new();
        let deadline = Instant::now() + window;
        info!(window_ms = window.as_millis() as u64, "Collecting script list");

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            match connection.next_event(Some(poll.min(deadline - now))).await {
                Ok(Some(event)) => {
                    catalog.record(&event);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, collected = catalog.len(), "Script collection ended early");
                    break;
                }
            }
        }

        info!(scripts = catalog.len(), "Script list collected");
        Ok(catalog)
    }

    /// Records a `Debugger.scriptParsed` event.
    ///
    /// Returns `true` if the event was recorded. Other events and scripts
    /// without a locator are ignored.
    pub fn record(&mut self, event: &Event) -> bool {
        match event.parse() {
            ParsedEvent::DebuggerScriptParsed { script_id, url } if !url.is_empty() => {
                self.insert(script_id, url);
                true
            }
            _ => false,
        }
    }

    /// Inserts or replaces one script.
    pub fn insert(&mut self, script_id: ScriptId, locator: impl Into<String>) {
        let locator = locator.into();

        if let Some(&slot) = self.index.get(&script_id) {
            debug!(%script_id, %locator, "Script re-announced");
            self.records[slot].locator = locator;
            return;
        }

        debug!(%script_id, %locator, "Script found");
        self.index.insert(script_id.clone(), self.records.len());
        self.records.push(ScriptRecord { script_id, locator });
    }

    /// Returns the locator recorded for `script_id`.
    #[must_use]
    pub fn get(&self, script_id: &ScriptId) -> Option<&str> {
        self.index
            .get(script_id)
            .map(|&slot| self.records[slot].locator.as_str())
    }

    /// Iterates records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &ScriptRecord> {
        self.records.iter()
    }

    /// Number of distinct scripts.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no script was recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a ScriptCatalog {
    type Item = &'a ScriptRecord;
    type IntoIter = std::slice::Iter<'a, ScriptRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
