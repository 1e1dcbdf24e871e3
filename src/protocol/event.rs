//! Event message types.
//!
//! Events are unsolicited notifications sent by the inspected target. They
//! carry no request id and are delivered in channel order.
//!
//! # Consumed Events
//!
//! | Domain | Events |
//! |--------|--------|
//! | `Page` | `loadEventFired` |
//! | `Debugger` | `scriptParsed` |
//! | `Console` | `messageAdded` |
//! | `Runtime` | `consoleAPICalled` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::ScriptId;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the inspected target.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Creates an event from its parts.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event::new("Page.loadEventFired", json!({}));
    /// assert_eq!(event.domain(), "Page");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Page.loadEventFired" => ParsedEvent::PageLoadEventFired {
                timestamp: self.params.get("timestamp").and_then(Value::as_f64),
            },

            "Debugger.scriptParsed" => ParsedEvent::DebuggerScriptParsed {
                script_id: ScriptId::new(self.get_string("scriptId")),
                url: self.get_string("url"),
            },

            "Console.messageAdded" => {
                let message = self.params.get("message").unwrap_or(&Value::Null);
                ParsedEvent::ConsoleMessageAdded {
                    level: string_or(message, "level", "info"),
                    text: string_or(message, "text", ""),
                    source: string_or(message, "source", ""),
                }
            }

            "Runtime.consoleAPICalled" => ParsedEvent::RuntimeConsoleApiCalled {
                call_type: string_or(&self.params, "type", "log"),
                args: self
                    .params
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|args| args.iter().map(render_remote_object).collect())
                    .unwrap_or_default(),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        string_or(&self.params, key, "")
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Page finished loading.
    PageLoadEventFired {
        /// Monotonic timestamp, if reported.
        timestamp: Option<f64>,
    },

    /// A script was parsed by the renderer.
    DebuggerScriptParsed {
        /// Debugger-assigned script id.
        script_id: ScriptId,
        /// Script locator; empty for inline or eval'd scripts.
        url: String,
    },

    /// Console message logged by the page or the browser.
    ConsoleMessageAdded {
        /// Severity (`log`, `warning`, `error`, ...).
        level: String,
        /// Message text.
        text: String,
        /// Origin of the message (`console-api`, `network`, ...).
        source: String,
    },

    /// A `console.*` function was called.
    RuntimeConsoleApiCalled {
        /// Call type (`log`, `error`, `warn`, ...).
        call_type: String,
        /// Arguments rendered as text.
        args: Vec<String>,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Gets a string field from a JSON object with default.
fn string_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Renders a `Runtime.RemoteObject` as text.
///
/// Uses `value` when present, then `description`, then `?`.
fn render_remote_object(object: &Value) -> String {
    match object.get("value") {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => object
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
