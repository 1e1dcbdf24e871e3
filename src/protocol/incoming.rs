//! Classification of inbound control-channel messages.
//!
//! Every text frame is either a [`Response`] (has an `id`) or an [`Event`]
//! (has a `method` and no `id`). Anything else is malformed.

use serde_json::Value;

use crate::error::{Error, Result};

use super::{Event, Response};

// ============================================================================
// Incoming
// ============================================================================

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Reply to a request.
    Response(Response),
    /// Unsolicited notification.
    Event(Event),
}

impl Incoming {
    /// Parses one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not JSON or the fields have the wrong shape
    /// - [`Error::Protocol`] if the frame has neither `id` nor `method`
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("id").is_some() {
            return Ok(Self::Response(serde_json::from_value(value)?));
        }

        if value.get("method").is_some_and(Value::is_string) {
            return Ok(Self::Event(serde_json::from_value(value)?));
        }

        Err(Error::protocol("message has neither id nor method"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::RequestId;

    #[test]
    fn test_parse_response() {
        let incoming = Incoming::parse(r#"{"id":4,"result":{}}"#).expect("parse");
        match incoming {
            Incoming::Response(response) => assert_eq!(response.id, RequestId::new(4)),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_event() {
        let incoming =
            Incoming::parse(r#"{"method":"Page.loadEventFired","params":{}}"#).expect("parse");
        assert!(matches!(incoming, Incoming::Event(_)));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(Incoming::parse("not json"), Err(Error::Json(_))));
        assert!(matches!(
            Incoming::parse(r#"{"params":{}}"#),
            Err(Error::Protocol { .. })
        ));
        assert!(matches!(
            Incoming::parse(r#"{"id":"abc"}"#),
            Err(Error::Json(_))
        ));
    }
}
