//! Control-channel connection with request/response correlation.
//!
//! This module handles the persistent channel to a DevTools target,
//! including request id assignment, response matching and event queueing.
//!
//! # Reading Model
//!
//! There is no background reader. Whichever call is blocked on the channel
//! reads it, one message at a time, in delivery order:
//!
//! - A response carrying the awaited id ends the wait
//! - A response carrying any other id is stray and discarded
//! - An event is appended to the event sink for later draining
//! - A malformed frame is logged and skipped
//!
//! Because every call borrows the connection mutably, at most one request is
//! outstanding at a time.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RESERVED_ID_BASE, RequestId};
use crate::protocol::{Command, Domain, Event, Incoming, Request, Response};

use super::socket::{Transport, WsTransport};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for [`Connection::call`].
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum queued events before the oldest are dropped.
const MAX_QUEUED_EVENTS: usize = 10_000;

/// First id issued by the per-connection counter.
const FIRST_REQUEST_ID: u64 = 1;

// ============================================================================
// PendingRequest
// ============================================================================

/// The single request awaiting its response.
#[derive(Debug, Clone)]
struct PendingRequest {
    id: RequestId,
    method: &'static str,
    issued_at: Instant,
}

// ============================================================================
// Connection
// ============================================================================

/// Persistent control channel to one DevTools target.
///
/// Generic over its [`Transport`]; production code uses [`WsTransport`].
///
/// # Example
///
/// ```ignore
/// let mut connection = Connection::connect(&target.control_address).await?;
/// connection.enable(Domain::Page).await?;
/// connection.close().await;
/// ```
pub struct Connection<T: Transport = WsTransport> {
    /// Underlying message channel.
    transport: T,
    /// Next id the counter will issue.
    next_id: u64,
    /// Event sink: unsolicited messages in delivery order.
    events: VecDeque<Event>,
    /// Timeout used by [`Connection::call`] and [`Connection::enable`].
    command_timeout: Duration,
    /// Set once the channel is closed locally or by the peer.
    closed: bool,
}

impl Connection<WsTransport> {
    /// Opens a WebSocket control channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let transport = WsTransport::connect(url).await?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport> Connection<T> {
    /// Wraps an already-open transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: FIRST_REQUEST_ID,
            events: VecDeque::new(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            closed: false,
        }
    }

    /// Sets the timeout used by [`call`](Self::call) and [`enable`](Self::enable).
    #[inline]
    #[must_use]
    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Returns `true` once the channel has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the number of events waiting in the sink.
    #[inline]
    #[must_use]
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Sends a command with a fresh counter id without waiting.
    ///
    /// A response that arrives later is treated as stray.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is closed
    /// - [`Error::IdSpaceExhausted`] if the counter reached the reserved range
    pub async fn send(&mut self, command: Command) -> Result<RequestId> {
        let id = self.next_request_id()?;
        self.write(&Request::new(id, command)).await?;
        Ok(id)
    }

    /// Sends a command and waits for the response with the same id.
    ///
    /// Events read while waiting go to the event sink. A response carrying an
    /// embedded protocol error is still returned as `Ok`; use
    /// [`Response::into_result`] to surface it.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if no match arrives within `timeout`; the
    ///   connection stays open
    /// - [`Error::ConnectionClosed`] if the channel closes while waiting
    pub async fn send_and_await(&mut self, command: Command, timeout: Duration) -> Result<Response> {
        let id = self.next_request_id()?;
        self.await_request(Request::new(id, command), timeout).await
    }

    /// Like [`send_and_await`](Self::send_and_await) with an id from the
    /// reserved range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `id` is not reserved, otherwise as
    /// [`send_and_await`](Self::send_and_await).
    pub async fn send_and_await_with_id(
        &mut self,
        id: RequestId,
        command: Command,
        timeout: Duration,
    ) -> Result<Response> {
        if !id.is_reserved() {
            return Err(Error::protocol(format!(
                "request id {id} is outside the reserved range"
            )));
        }
        self.await_request(Request::new(id, command), timeout).await
    }

    /// Sends a command with the default timeout and returns its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] for an embedded protocol error, otherwise as
    /// [`send_and_await`](Self::send_and_await).
    pub async fn call(&mut self, command: Command) -> Result<Value> {
        let method = command.method();
        let timeout = self.command_timeout;
        self.send_and_await(command, timeout)
            .await?
            .into_result(method)
    }

    /// Issues `<Domain>.enable` and discards the result.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call).
    pub async fn enable(&mut self, domain: Domain) -> Result<()> {
        self.call(domain.enable_command()).await?;
        debug!(%domain, "Domain enabled");
        Ok(())
    }

    // ========================================================================
    // Event Sink
    // ========================================================================

    /// Returns the next event, reading the channel if the sink is empty.
    ///
    /// Returns `Ok(None)` if no event arrives within `timeout`. With `None`
    /// as timeout the call waits until an event arrives or the channel fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] once the sink is empty and the
    /// channel has closed.
    pub async fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<Event>> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            match self.read_incoming(deadline).await? {
                None => return Ok(None),
                Some(Incoming::Event(event)) => return Ok(Some(event)),
                Some(Incoming::Response(response)) => {
                    debug!(id = %response.id, "Discarding stray response");
                }
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the channel.
    ///
    /// Closing an already-closed connection is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            trace!("Connection already closed");
            return;
        }
        self.closed = true;

        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "Error closing control channel");
        }
        debug!(dropped_events = self.events.len(), "Connection closed");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Draws the next id from the counter.
    fn next_request_id(&mut self) -> Result<RequestId> {
        if self.next_id >= RESERVED_ID_BASE {
            return Err(Error::IdSpaceExhausted { next: self.next_id });
        }
        let id = RequestId::new(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    /// Writes a request and reads until its response or the deadline.
    async fn await_request(&mut self, request: Request, timeout: Duration) -> Result<Response> {
        let pending = PendingRequest {
            id: request.id,
            method: request.method(),
            issued_at: Instant::now(),
        };
        let deadline = pending.issued_at + timeout;

        self.write(&request).await?;

        loop {
            match self.read_incoming(Some(deadline)).await? {
                None => {
                    warn!(
                        id = %pending.id,
                        method = pending.method,
                        timeout_ms = timeout.as_millis() as u64,
                        "Request timed out"
                    );
                    return Err(Error::request_timeout(
                        pending.id,
                        pending.method,
                        timeout.as_millis() as u64,
                    ));
                }

                Some(Incoming::Response(response)) if response.id == pending.id => {
                    trace!(
                        id = %pending.id,
                        method = pending.method,
                        elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
                        "Response matched"
                    );
                    return Ok(response);
                }

                Some(Incoming::Response(response)) => {
                    debug!(id = %response.id, awaiting = %pending.id, "Discarding stray response");
                }

                Some(Incoming::Event(event)) => self.push_event(event),
            }
        }
    }

    /// Serializes and writes one request.
    async fn write(&mut self, request: &Request) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        let json = serde_json::to_string(request)?;
        if let Err(e) = self.transport.send_text(json).await {
            self.closed = true;
            return Err(e);
        }

        trace!(id = %request.id, method = request.method(), "Request sent");
        Ok(())
    }

    /// Reads the next well-formed message.
    ///
    /// Returns `Ok(None)` when `deadline` passes first.
    async fn read_incoming(&mut self, deadline: Option<Instant>) -> Result<Option<Incoming>> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }

        loop {
            let received = match deadline {
                Some(deadline) => match timeout_at(deadline, self.transport.recv_text()).await {
                    Ok(received) => received,
                    Err(_) => return Ok(None),
                },
                None => self.transport.recv_text().await,
            };

            let text = match received {
                Ok(Some(text)) => text,
                Ok(None) => {
                    self.closed = true;
                    return Err(Error::ConnectionClosed);
                }
                Err(e) => {
                    self.closed = true;
                    return Err(e);
                }
            };

            match Incoming::parse(&text) {
                Ok(incoming) => return Ok(Some(incoming)),
                Err(e) => warn!(error = %e, len = text.len(), "Ignoring malformed message"),
            }
        }
    }

    /// Appends an event to the sink, dropping the oldest when full.
    fn push_event(&mut self, event: Event) {
        if self.events.len() >= MAX_QUEUED_EVENTS
            && let Some(dropped) = self.events.pop_front()
        {
            warn!(method = %dropped.method, max = MAX_QUEUED_EVENTS, "Event sink full, dropping oldest");
        }
        trace!(method = %event.method, "Event queued");
        self.events.push_back(event);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::identifiers::{MAX_WIRE_ID, ScriptId};
    use crate::protocol::{DebuggerCommand, PageCommand};
    use crate::transport::mock::{MockTransport, ack, error_reply, event, reply};

    const SHORT: Duration = Duration::from_millis(100);

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
        assert!(FIRST_REQUEST_ID < RESERVED_ID_BASE);
    }

    #[tokio::test]
    async fn test_send_ids_are_unique_and_increasing() {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let mut connection = Connection::new(transport);

        let mut ids = Vec::new();
        for _ in 0..50 {
            ids.push(connection.send(Domain::Page.enable_command()).await.expect("send"));
        }

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], RequestId::new(1));

        let wire_ids: Vec<u64> = handle
            .sent()
            .iter()
            .map(|v| v["id"].as_u64().expect("numeric id"))
            .collect();
        assert_eq!(wire_ids, (1..=50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_send_and_await_skips_events_and_stray_responses() {
        let transport = MockTransport::new().with_responder(|request| {
            let id = request["id"].as_u64().expect("id");
            vec![
                event("Debugger.scriptParsed", json!({ "scriptId": "1", "url": "a.js" })),
                reply(id + 100, json!({ "stray": true })),
                event("Console.messageAdded", json!({ "message": { "text": "hi" } })),
                "{ not json".to_string(),
                reply(id, json!({ "ok": 1 })),
                event("Page.loadEventFired", json!({})),
            ]
        });
        let mut connection = Connection::new(transport);

        let response = connection
            .send_and_await(Domain::Debugger.enable_command(), SHORT)
            .await
            .expect("matched response");

        assert_eq!(response.id, RequestId::new(1));
        assert_eq!(response.get("ok"), Some(&json!(1)));
        assert_eq!(connection.queued_events(), 2);

        let first = connection.next_event(Some(SHORT)).await.expect("read");
        let second = connection.next_event(Some(SHORT)).await.expect("read");
        assert_eq!(first.map(|e| e.method), Some("Debugger.scriptParsed".to_string()));
        assert_eq!(second.map(|e| e.method), Some("Console.messageAdded".to_string()));

        // The trailing event is still on the channel.
        let third = connection.next_event(Some(SHORT)).await.expect("read");
        assert_eq!(third.map(|e| e.method), Some("Page.loadEventFired".to_string()));
    }

    #[tokio::test]
    async fn test_send_and_await_returns_embedded_error() {
        let transport = MockTransport::new().with_responder(|request| {
            vec![error_reply(request["id"].as_u64().expect("id"), "nope")]
        });
        let mut connection = Connection::new(transport);

        let response = connection
            .send_and_await(Domain::Console.enable_command(), SHORT)
            .await
            .expect("response");
        assert!(response.is_error());

        let err = connection.enable(Domain::Console).await.expect_err("remote error");
        assert!(matches!(err, Error::Remote { .. }));
        assert!(!connection.is_closed());
    }

    #[tokio::test]
    async fn test_send_and_await_times_out_on_silent_peer() {
        let mut connection = Connection::new(MockTransport::new());

        let started = std::time::Instant::now();
        let err = connection
            .send_and_await(Command::Page(PageCommand::Reload { ignore_cache: true }), SHORT)
            .await
            .expect_err("timeout");

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!connection.is_closed());

        // The connection remains usable.
        assert!(connection.send(Domain::Page.enable_command()).await.is_ok());
    }

    #[tokio::test]
    async fn test_reserved_id_round_trip() {
        let script_id = "17".into();
        let id = RequestId::for_script(&script_id).expect("numeric");
        let transport = MockTransport::new()
            .with_incoming([reply(1, json!({})), reply(id.as_u64(), json!({ "scriptSource": "x" }))]);
        let mut connection = Connection::new(transport);

        let response = connection
            .send_and_await_with_id(
                id,
                Command::Debugger(DebuggerCommand::GetScriptSource { script_id }),
                SHORT,
            )
            .await
            .expect("response");
        assert_eq!(response.get_str("scriptSource"), Some("x"));
    }

    #[tokio::test]
    async fn test_wire_ids_fit_i32() {
        let transport = MockTransport::new().with_responder(|request| vec![ack(request)]);
        let handle = transport.handle();
        let mut connection = Connection::new(transport);

        connection.enable(Domain::Debugger).await.expect("enable");
        for script in ["0", "17", "4294967296"] {
            let script_id: ScriptId = script.into();
            let Some(id) = RequestId::for_script(&script_id) else {
                continue;
            };
            connection
                .send_and_await_with_id(
                    id,
                    Command::Debugger(DebuggerCommand::GetScriptSource { script_id }),
                    SHORT,
                )
                .await
                .expect("response");
        }

        let sent = handle.sent();
        assert_eq!(sent.len(), 3);
        for request in sent {
            let id = request["id"].as_i64().expect("integer id");
            assert!(i32::try_from(id).is_ok(), "id {id} does not fit i32");
        }
    }

    #[tokio::test]
    async fn test_explicit_id_above_i32_is_rejected() {
        let mut connection = Connection::new(MockTransport::new());
        let err = connection
            .send_and_await_with_id(
                RequestId::new(MAX_WIRE_ID + 1),
                Domain::Page.enable_command(),
                SHORT,
            )
            .await
            .expect_err("rejected");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_unreserved_explicit_id_is_rejected() {
        let mut connection = Connection::new(MockTransport::new());
        let err = connection
            .send_and_await_with_id(RequestId::new(5), Domain::Page.enable_command(), SHORT)
            .await
            .expect_err("rejected");
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_counter_refuses_reserved_range() {
        let mut connection = Connection::new(MockTransport::new());
        connection.next_id = RESERVED_ID_BASE - 1;

        assert!(connection.send(Domain::Page.enable_command()).await.is_ok());
        let err = connection
            .send(Domain::Page.enable_command())
            .await
            .expect_err("exhausted");
        assert!(matches!(err, Error::IdSpaceExhausted { .. }));
    }

    #[tokio::test]
    async fn test_peer_hang_up_is_connection_closed() {
        let transport = MockTransport::new()
            .with_incoming([event("Page.loadEventFired", json!({}))])
            .hang_up_when_drained();
        let mut connection = Connection::new(transport);

        let err = connection
            .send_and_await(Domain::Page.enable_command(), SHORT)
            .await
            .expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(connection.is_closed());

        // Events read before the hang-up are still drainable.
        let queued = connection.next_event(Some(SHORT)).await.expect("queued event");
        assert!(queued.is_some());
        assert!(matches!(
            connection.next_event(Some(SHORT)).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_next_event_times_out() {
        let mut connection = Connection::new(MockTransport::new());
        let event = connection.next_event(Some(SHORT)).await.expect("no error");
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MockTransport::new();
        let handle = transport.handle();
        let mut connection = Connection::new(transport);

        connection.close().await;
        connection.close().await;

        assert!(connection.is_closed());
        assert_eq!(handle.close_count(), 1);
        assert!(matches!(
            connection.send(Domain::Page.enable_command()).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_enable_discards_result() {
        let transport = MockTransport::new().with_responder(|request| vec![ack(request)]);
        let handle = transport.handle();
        let mut connection = Connection::new(transport);

        connection.enable(Domain::Runtime).await.expect("enable");
        assert_eq!(handle.sent_methods(), vec!["Runtime.enable"]);
    }
}
