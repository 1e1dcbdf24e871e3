//! Control-channel transport layer.
//!
//! This module handles communication between the client and the
//! DevTools target over one persistent WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  cef-probe      │                              │  Renderer       │
//! │                 │         WebSocket            │  (CEF/Chromium) │
//! │  Connection     │◄────────────────────────────►│                 │
//! │  → Transport    │  /devtools/page/<target>     │  DevTools agent │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - WebSocket handshake with the target
//! 2. `Connection::send_and_await` - One request at a time, matched by id
//! 3. `Connection::next_event` - Drain the event sink
//! 4. `Connection::close` - Close frame (idempotent)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Correlation, event sink, lifecycle |
//! | `socket` | `Transport` trait and WebSocket implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Correlating connection and event sink.
pub mod connection;

/// Transport trait and WebSocket implementation.
pub mod socket;

/// Scripted transport for unit tests.
#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_COMMAND_TIMEOUT};
pub use socket::{Transport, WsTransport};
