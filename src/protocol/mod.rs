//! DevTools protocol message types.
//!
//! This module defines the message format exchanged over the control
//! channel.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Target | Command request with numeric `id` |
//! | `Response` | Target → Client | `result` or `error` for one `id` |
//! | `Event` | Target → Client | Notification without `id` |
//!
//! # Command Naming
//!
//! Commands follow `Domain.method` format:
//!
//! - `Page.reload`
//! - `Runtime.evaluate`
//! - `Debugger.getScriptSource`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event types |
//! | `incoming` | Response/event classification |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Inbound message classification.
pub mod incoming;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, ConsoleCommand, DebuggerCommand, Domain, PageCommand, RuntimeCommand};
pub use event::{Event, ParsedEvent};
pub use incoming::Incoming;
pub use request::{Request, Response, ResponseError};
