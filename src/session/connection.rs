//! WebSocket connection to the streaming search backend
//!
//! One connection per search: open, send the request once, then read frames
//! until the stream ends. Reconnection is deliberately absent; a dropped
//! connection surfaces as a transport error and the session ends.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::protocol::SearchRequest;

/// Errors from the WebSocket transport layer
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to serialize search request: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Derive the search WebSocket endpoint from the REST base URL
///
/// An explicit override wins; otherwise the scheme is rewritten http to ws
/// (https to wss) and the search path appended.
pub fn ws_endpoint(api_base_url: &str, override_url: Option<&str>) -> String {
    if let Some(url) = override_url {
        return url.to_string();
    }
    let base = api_base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/ws/search")
}

/// A live connection with the request already sent
pub struct Connection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl Connection {
    /// Connect and send the search request
    pub async fn open(url: &str, request: &SearchRequest) -> Result<Self, ConnectionError> {
        debug!(%url, request_id = %request.request_id, "Connection: opening");
        let (mut stream, _response) = connect_async(url).await?;

        let payload = serde_json::to_string(request)?;
        stream.send(Message::Text(payload.into())).await?;
        debug!(request_id = %request.request_id, "Connection: request sent");

        Ok(Self { stream, closed: false })
    }

    /// Next text frame, or `None` once the stream has ended
    ///
    /// Pings are answered and binary frames skipped transparently.
    pub async fn next_frame(&mut self) -> Result<Option<String>, ConnectionError> {
        loop {
            let Some(msg) = self.stream.next().await else {
                return Ok(None);
            };
            match msg? {
                Message::Text(text) => {
                    trace!(len = text.len(), "Connection: text frame");
                    return Ok(Some(text.to_string()));
                }
                Message::Ping(payload) => {
                    self.stream.send(Message::Pong(payload)).await?;
                }
                Message::Close(_) => {
                    self.closed = true;
                    return Ok(None);
                }
                // Pongs and binary frames carry nothing for this protocol
                _ => {}
            }
        }
    }

    /// Close the connection; safe to call more than once
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(err) = self.stream.close(None).await {
            debug!(%err, "Connection: close failed");
        }
    }
}
