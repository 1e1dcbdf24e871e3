//! Message-oriented socket underneath a [`Connection`](super::Connection).
//!
//! The [`Transport`] trait is the seam between correlation logic and the
//! wire. [`WsTransport`] is the WebSocket implementation used against a real
//! DevTools endpoint.
//!
//! # Connection Flow
//!
//! 1. Discovery yields a `webSocketDebuggerUrl`
//! 2. [`WsTransport::connect`] performs the WebSocket handshake
//! 3. Text frames carry one JSON message each
//! 4. [`Transport::close`] sends a close frame

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};

// ============================================================================
// Transport
// ============================================================================

/// An ordered, message-oriented duplex channel.
///
/// Implementations must deliver inbound messages in the order the peer sent
/// them and must tolerate `recv_text` being cancelled between messages.
#[async_trait]
pub trait Transport: Send {
    /// Sends one text message.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Receives the next text message.
    ///
    /// Returns `Ok(None)` once the peer has closed the channel.
    async fn recv_text(&mut self) -> Result<Option<String>>;

    /// Closes the channel.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket transport to a DevTools target.
pub struct WsTransport {
    /// Underlying stream.
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Address the stream was opened against.
    url: String,
}

impl WsTransport {
    /// Opens a WebSocket to a control-channel address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self> {
        debug!(url, "Opening control channel");

        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| Error::connection(url, e.to_string()))?;

        info!(url, status = %response.status(), "Control channel established");

        Ok(Self {
            stream,
            url: url.to_string(),
        })
    }

    /// Returns the address this transport is connected to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),

                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => trace!(len = bytes.len(), "Ignoring non-UTF-8 binary frame"),
                },

                Some(Ok(Message::Close(frame))) => {
                    debug!(url = %self.url, ?frame, "WebSocket closed by remote");
                    return Ok(None);
                }

                Some(Err(e)) => return Err(Error::WebSocket(e)),

                None => {
                    debug!(url = %self.url, "WebSocket stream ended");
                    return Ok(None);
                }

                // Ignore Ping, Pong, Frame
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
