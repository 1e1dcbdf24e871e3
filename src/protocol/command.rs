//! Command definitions organized by domain.
//!
//! Commands follow the DevTools `Domain.method` format.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Page` | `enable`, `reload` |
//! | `Runtime` | `enable`, `evaluate` |
//! | `Console` | `enable` |
//! | `Debugger` | `enable`, `getScriptSource` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::ScriptId;

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page domain commands.
    Page(PageCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Console domain commands.
    Console(ConsoleCommand),
    /// Debugger domain commands.
    Debugger(DebuggerCommand),
}

impl Command {
    /// Returns the wire method name, e.g. `Page.reload`.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Page(PageCommand::Enable) => "Page.enable",
            Self::Page(PageCommand::Reload { .. }) => "Page.reload",
            Self::Runtime(RuntimeCommand::Enable) => "Runtime.enable",
            Self::Runtime(RuntimeCommand::Evaluate { .. }) => "Runtime.evaluate",
            Self::Console(ConsoleCommand::Enable) => "Console.enable",
            Self::Debugger(DebuggerCommand::Enable) => "Debugger.enable",
            Self::Debugger(DebuggerCommand::GetScriptSource { .. }) => "Debugger.getScriptSource",
        }
    }
}

// ============================================================================
// Domain
// ============================================================================

/// Protocol domains that can be enabled on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Page lifecycle notifications.
    Page,
    /// Runtime evaluation and console API calls.
    Runtime,
    /// Console message notifications.
    Console,
    /// Script parsing notifications and source access.
    Debugger,
}

impl Domain {
    /// Returns the `<Domain>.enable` command.
    #[must_use]
    pub const fn enable_command(self) -> Command {
        match self {
            Self::Page => Command::Page(PageCommand::Enable),
            Self::Runtime => Command::Runtime(RuntimeCommand::Enable),
            Self::Console => Command::Console(ConsoleCommand::Enable),
            Self::Debugger => Command::Debugger(DebuggerCommand::Enable),
        }
    }

    /// Returns the domain name as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Page => "Page",
            Self::Runtime => "Runtime",
            Self::Console => "Console",
            Self::Debugger => "Debugger",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page lifecycle events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Reload the inspected page.
    #[serde(rename = "Page.reload")]
    Reload {
        /// Bypass the cache (shift-refresh).
        #[serde(rename = "ignoreCache")]
        ignore_cache: bool,
    },
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Enable runtime events (`Runtime.consoleAPICalled`).
    #[serde(rename = "Runtime.enable")]
    Enable,

    /// Evaluate an expression in the page's global context.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// Source text to evaluate.
        expression: String,
        /// Return the result as a JSON value instead of a remote object.
        #[serde(rename = "returnByValue", skip_serializing_if = "Option::is_none")]
        return_by_value: Option<bool>,
        /// Treat the evaluation as initiated by a user gesture.
        #[serde(rename = "userGesture", skip_serializing_if = "Option::is_none")]
        user_gesture: Option<bool>,
        /// Wait for a returned promise to settle.
        #[serde(rename = "awaitPromise", skip_serializing_if = "Option::is_none")]
        await_promise: Option<bool>,
    },
}

// ============================================================================
// Console Commands
// ============================================================================

/// Console domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ConsoleCommand {
    /// Enable `Console.messageAdded` events.
    #[serde(rename = "Console.enable")]
    Enable,
}

// ============================================================================
// Debugger Commands
// ============================================================================

/// Debugger domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DebuggerCommand {
    /// Enable `Debugger.scriptParsed` events.
    #[serde(rename = "Debugger.enable")]
    Enable,

    /// Fetch the source text of a parsed script.
    #[serde(rename = "Debugger.getScriptSource")]
    GetScriptSource {
        /// Script to fetch.
        #[serde(rename = "scriptId")]
        script_id: ScriptId,
    },
}

// ============================================================================
// Tests
// ============================================================================
