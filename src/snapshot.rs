//! Live DOM capture.
//!
//! Serializes the current document in the renderer with `XMLSerializer` and
//! stores it as `<root>/dom/snapshot_<YYYYmmdd_HHMMSS>.html`.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::protocol::{Command, RuntimeCommand};
use crate::transport::{Connection, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Expression producing the serialized document.
pub const SERIALIZE_DOCUMENT: &str = "new XMLSerializer().serializeToString(document)";

/// Subdirectory of the output root holding snapshots.
pub const SNAPSHOT_DIR: &str = "dom";

// ============================================================================
// Capture
// ============================================================================

/// Serializes the live document and returns its markup.
///
/// # Errors
///
/// - [`Error::Remote`] if the evaluation request is rejected
/// - [`Error::ScriptException`] if serialization throws
/// - [`Error::Protocol`] if the result carries no string value
pub async fn capture_dom<T: Transport>(connection: &mut Connection<T>) -> Result<String> {
    let result = connection
        .call(Command::Runtime(RuntimeCommand::Evaluate {
            expression: SERIALIZE_DOCUMENT.to_string(),
            return_by_value: Some(true),
            user_gesture: None,
            await_promise: None,
        }))
        .await?;

    if let Some(details) = result.get("exceptionDetails") {
        let text = details
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or("exception while serializing document");
        return Err(Error::script_exception(text));
    }

    result
        .pointer("/result/value")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::protocol("document serialization returned no string value"))
}

/// Default snapshot file name for `now`.
#[must_use]
pub fn snapshot_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("snapshot_{}.html", now.format("%Y%m%d_%H%M%S"))
}

/// Appends `.html` to a caller-chosen snapshot name that lacks it.
#[must_use]
pub fn html_file_name(name: &str) -> String {
    if name.ends_with(".html") {
        name.to_string()
    } else {
        format!("{name}.html")
    }
}

/// Writes `html` to `<root>/dom/<file_name>` and returns the path.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or file cannot be written.
pub fn save_snapshot(root: &Path, file_name: &str, html: &str) -> Result<PathBuf> {
    let dir = root.join(SNAPSHOT_DIR);
    fs::create_dir_all(&dir)?;

    let path = dir.join(file_name);
    fs::write(&path, html)?;
    info!(path = %path.display(), bytes = html.len(), "DOM saved");
    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use serde_json::json;

    use crate::transport::mock::{MockTransport, reply};

    #[test]
    fn test_snapshot_file_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).single().expect("valid time");
        assert_eq!(snapshot_file_name(&at), "snapshot_20240309_070501.html");
    }

    #[test]
    fn test_html_file_name_appends_extension() {
        assert_eq!(html_file_name("main"), "main.html");
        assert_eq!(html_file_name("main.html"), "main.html");
        assert_eq!(html_file_name("page.htm"), "page.htm.html");
    }

    #[tokio::test]
    async fn test_capture_dom_returns_markup() {
        let transport = MockTransport::new().with_responder(|request| {
            vec![reply(
                request["id"].as_u64().expect("id"),
                json!({ "result": { "type": "string", "value": "<html></html>" } }),
            )]
        });
        let handle = transport.handle();
        let mut connection = Connection::new(transport);

        let html = capture_dom(&mut connection).await.expect("html");
        assert_eq!(html, "<html></html>");

        let sent = handle.sent();
        assert_eq!(sent[0]["method"], "Runtime.evaluate");
        assert_eq!(sent[0]["params"]["expression"], SERIALIZE_DOCUMENT);
        assert_eq!(sent[0]["params"]["returnByValue"], true);
    }

    #[tokio::test]
    async fn test_capture_dom_reports_exception() {
        let transport = MockTransport::new().with_responder(|request| {
            vec![reply(
                request["id"].as_u64().expect("id"),
                json!({ "result": { "type": "object" }, "exceptionDetails": { "text": "Uncaught" } }),
            )]
        });
        let mut connection = Connection::new(transport);

        let err = capture_dom(&mut connection).await.expect_err("exception");
        assert!(matches!(err, Error::ScriptException { .. }));
    }

    #[tokio::test]
    async fn test_capture_dom_without_value() {
        let transport = MockTransport::new().with_responder(|request| {
            vec![reply(request["id"].as_u64().expect("id"), json!({ "result": { "type": "undefined" } }))]
        });
        let mut connection = Connection::new(transport);

        let err = capture_dom(&mut connection).await.expect_err("no value");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_save_snapshot_writes_under_dom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = save_snapshot(dir.path(), "snap.html", "<p>x</p>").expect("save");

        assert_eq!(path, dir.path().join("dom").join("snap.html"));
        assert_eq!(fs::read_to_string(path).expect("read"), "<p>x</p>");
    }
}
