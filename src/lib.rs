//! cef-probe - DevTools protocol client for Chromium-embedded applications.
//!
//! This library attaches to an application started with
//! `--remote-debugging-port`, dumps the scripts its renderer has loaded,
//! injects scripts into the live page and captures the DOM.
//!
//! # Architecture
//!
//! ```text
//! TargetDiscovery ──► control address ──► Connection ──┬──► ScriptCatalog ──► ResourceFetcher ──► sanitize
//!   (GET /json)                          (WebSocket)   ├──► Injector
//!                                                      └──► capture_dom
//! ```
//!
//! Key design principles:
//!
//! - One persistent control channel per run, exclusively borrowed
//! - No background reader: the blocked call reads the channel
//! - Unsolicited events queue in an event sink, in delivery order
//! - Locators become paths made of normal components only
//!
//! # Quick Start
//!
//! ```no_run
//! use cef_probe::{
//!     Connection, DirectorySink, ProbeConfig, ResourceFetcher, Result, ScriptCatalog,
//!     TargetDiscovery,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ProbeConfig::builder().port(9222).build()?;
//!
//!     let Some(target) = TargetDiscovery::new(&config)?.discover().await else {
//!         eprintln!("no debugging target");
//!         return Ok(());
//!     };
//!     let Some(address) = target.control_address else {
//!         return Ok(());
//!     };
//!
//!     let mut connection = Connection::connect(&address).await?;
//!     let catalog =
//!         ScriptCatalog::collect(&mut connection, config.scan_window(), config.scan_poll()).await?;
//!
//!     let mut sink = DirectorySink::new(config.output_root());
//!     let report = ResourceFetcher::from_config(&config)
//!         .fetch_all(&mut connection, &catalog, &mut sink)
//!         .await;
//!     println!("saved {} scripts", report.saved);
//!
//!     connection.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Parsed-script collection |
//! | [`config`] | [`ProbeConfig`] and its builder |
//! | [`discovery`] | `/json` polling and target selection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`fetcher`] | Script-source download into a [`SourceSink`] |
//! | [`identifiers`] | Request and script ids |
//! | [`inject`] | Reload, evaluate, console relay |
//! | [`protocol`] | Wire message types |
//! | [`sanitize`] | Locator to relative path mapping |
//! | [`snapshot`] | DOM serialization |
//! | [`transport`] | Control channel and correlation |

// ============================================================================
// Modules
// ============================================================================

/// Parsed-script collection.
pub mod catalog;

/// Probe configuration.
///
/// Use [`ProbeConfig::builder()`] to create a validated configuration.
pub mod config;

/// Debugging target discovery.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Script-source download.
pub mod fetcher;

/// Request and script identifiers.
///
/// Includes the reserved request-id range used for script fetches.
pub mod identifiers;

/// Script injection and console relay.
pub mod inject;

/// DevTools protocol message types.
pub mod protocol;

/// Locator to filesystem path mapping.
pub mod sanitize;

/// DOM snapshot capture.
pub mod snapshot;

/// Control-channel transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Catalog types
pub use catalog::{ScriptCatalog, ScriptRecord};

// Configuration types
pub use config::{ProbeConfig, ProbeConfigBuilder};

// Discovery types
pub use discovery::{Target, TargetDiscovery, select_target};

// Error types
pub use error::{Error, Result};

// Fetcher types
pub use fetcher::{DirectorySink, FetchFailure, FetchReport, ResourceFetcher, SourceSink};

// Identifier types
pub use identifiers::{MAX_WIRE_ID, RESERVED_ID_BASE, RequestId, ScriptId};

// Injection types
pub use inject::{
    ConsoleEntry, ConsoleObserver, ConsoleSource, Evaluation, InjectionReport, InjectionState,
    Injector, MonitorExit,
};

// Protocol types
pub use protocol::{Command, Domain, Event, ParsedEvent, Response};

// Path mapping
pub use sanitize::sanitize;

// Snapshot functions
pub use snapshot::{capture_dom, html_file_name, save_snapshot, snapshot_file_name};

// Transport types
pub use transport::{Connection, Transport, WsTransport};
