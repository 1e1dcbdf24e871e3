//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing request ids with script ids.
//!
//! # Request Id Ranges
//!
//! | Range | Issued by |
//! |-------|-----------|
//! | `1 ..< RESERVED_ID_BASE` | Per-connection counter ([`Connection::send`]) |
//! | `RESERVED_ID_BASE ..= MAX_WIRE_ID` | Derived from numeric script ids ([`RequestId::for_script`]) |
//!
//! The two ranges never overlap: the connection refuses to issue a counter
//! id at or above [`RESERVED_ID_BASE`]. Both stay within [`MAX_WIRE_ID`];
//! the renderer rejects a request whose `id` is not a 32-bit signed integer,
//! and that rejection carries no `id` to correlate with.
//!
//! [`Connection::send`]: crate::transport::Connection::send

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Largest request id the renderer accepts (`i32::MAX`).
pub const MAX_WIRE_ID: u64 = i32::MAX as u64;

/// First id of the range reserved for script-derived request ids.
pub const RESERVED_ID_BASE: u64 = 1 << 30;

// ============================================================================
// RequestId
// ============================================================================

/// Identifier correlating a request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Derives a request id in the reserved range from a script id.
    ///
    /// Returns `None` when the script id is not a decimal integer or the
    /// derived id would exceed [`MAX_WIRE_ID`].
    #[inline]
    #[must_use]
    pub fn for_script(script_id: &ScriptId) -> Option<Self> {
        script_id
            .as_number()
            .and_then(|n| RESERVED_ID_BASE.checked_add(n))
            .filter(|&id| id <= MAX_WIRE_ID)
            .map(Self)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if the id lies in the script-derived range.
    #[inline]
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 >= RESERVED_ID_BASE && self.0 <= MAX_WIRE_ID
    }

    /// Returns `true` if the renderer accepts this id.
    #[inline]
    #[must_use]
    pub const fn fits_wire(self) -> bool {
        self.0 >= 1 && self.0 <= MAX_WIRE_ID
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ScriptId
// ============================================================================

/// Identifier the debugger assigns to a parsed script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(String);

impl ScriptId {
    /// Wraps a raw script id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the id as a decimal integer.
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
