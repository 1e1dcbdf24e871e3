//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{Error, Result};

use super::Transport;

/// Produces replies for each request the client sends.
type Responder = Box<dyn FnMut(&Value) -> Vec<String> + Send>;

/// In-memory [`Transport`] fed from a queue of canned frames.
///
/// When the queue is empty `recv_text` either never resolves (a silent
/// peer) or reports end of stream, depending on [`hang_up_when_drained`].
///
/// [`hang_up_when_drained`]: MockTransport::hang_up_when_drained
pub(crate) struct MockTransport {
    inbox: VecDeque<String>,
    responder: Option<Responder>,
    hang_up: bool,
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
}

/// Observer side of a [`MockTransport`], kept by the test.
#[derive(Clone)]
pub(crate) struct MockHandle {
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            responder: None,
            hang_up: false,
            sent: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queues frames delivered before anything the responder produces.
    pub(crate) fn with_incoming<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inbox.extend(frames.into_iter().map(Into::into));
        self
    }

    /// Replies to every sent request with the frames `f` returns.
    pub(crate) fn with_responder<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Value) -> Vec<String> + Send + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Reports end of stream once the inbox is empty.
    pub(crate) fn hang_up_when_drained(mut self) -> Self {
        self.hang_up = true;
        self
    }

    pub(crate) fn handle(&self) -> MockHandle {
        MockHandle {
            sent: Arc::clone(&self.sent),
            closes: Arc::clone(&self.closes),
        }
    }
}

impl MockHandle {
    /// Requests the client has written, in order.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Methods of the requests the client has written, in order.
    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|v| v["method"].as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        let value: Value = serde_json::from_str(&text)?;
        if let Some(responder) = self.responder.as_mut() {
            self.inbox.extend(responder(&value));
        }
        self.sent.lock().expect("sent lock").push(value);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>> {
        if let Some(frame) = self.inbox.pop_front() {
            return Ok(Some(frame));
        }
        if self.hang_up {
            return Ok(None);
        }
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<()> {
        if self.closes.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }
}

// ============================================================================
// Frame Helpers
// ============================================================================

/// Empty success response for `request`.
pub(crate) fn ack(request: &Value) -> String {
    json!({ "id": request["id"], "result": {} }).to_string()
}

/// Success response with the given result.
pub(crate) fn reply(id: u64, result: Value) -> String {
    json!({ "id": id, "result": result }).to_string()
}

/// Error response.
pub(crate) fn error_reply(id: u64, message: &str) -> String {
    json!({ "id": id, "error": { "code": -32000, "message": message } }).to_string()
}

/// Event frame.
pub(crate) fn event(method: &str, params: Value) -> String {
    json!({ "method": method, "params": params }).to_string()
}
