//! Low-level CDP WebSocket client.
//!
//! Commands carry auto-incrementing ids and are matched to their responses by
//! a background reader task. Messages without an `id` are events and go to the
//! [`EventStream`] handed out at connect time, so callers can await events
//! while issuing commands through a shared `&CdpClient`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::SessionError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>;

/// Receiver for CDP events of one connection. Closes when the socket does.
pub type EventStream = mpsc::UnboundedReceiver<CdpEvent>;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// A CDP event, e.g. `Network.requestWillBeSent`.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, serde::Serialize)]
struct CdpCommand<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug)]
struct CdpResponse {
    result: Option<Value>,
    error: Option<CdpResponseError>,
}

#[derive(Debug, serde::Deserialize)]
struct CdpResponseError {
    code: i64,
    message: String,
}

/// One WebSocket connection to a DevTools page target.
pub struct CdpClient {
    next_id: AtomicU64,
    pending: PendingMap,
    writer: Mutex<WsSink>,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connects to a page's `webSocketDebuggerUrl`
    /// (`ws://localhost:9222/devtools/page/{id}`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ConnectionFailed`] if the handshake fails.
    pub async fn connect(ws_url: &str) -> Result<(Self, EventStream), SessionError> {
        tracing::info!(url = ws_url, "connecting to DevTools WebSocket");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| SessionError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        let (writer, reader) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader_handle = tokio::spawn(read_loop(reader, Arc::clone(&pending), event_tx));

        Ok((
            Self {
                next_id: AtomicU64::new(1),
                pending,
                writer: Mutex::new(writer),
                reader_handle,
            },
            event_rx,
        ))
    }

    /// Sends a command and waits up to 30 s for its result.
    ///
    /// # Errors
    ///
    /// - [`SessionError::CdpError`] if the browser answers with an error.
    /// - [`SessionError::Timeout`] if no answer arrives in time.
    /// - [`SessionError::Protocol`] if the socket write fails or the connection
    ///   drops first.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, SessionError> {
        self.send_command_with_timeout(method, params, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Like [`CdpClient::send_command`] with an explicit timeout.
    ///
    /// # Errors
    ///
    /// See [`CdpClient::send_command`].
    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = serde_json::to_string(&CdpCommand { id, method, params }).map_err(|e| {
            SessionError::Protocol {
                detail: format!("failed to serialize command: {e}"),
            }
        })?;

        tracing::debug!(id, method, "sending CDP command");

        // Register before sending so a fast reply is never missed.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let sent = self
            .writer
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await;
        if let Err(e) = sent {
            self.pending.lock().await.remove(&id);
            return Err(SessionError::Protocol {
                detail: format!("failed to send WebSocket message: {e}"),
            });
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(SessionError::Protocol {
                    detail: "response channel closed unexpectedly".to_string(),
                })
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(SessionError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                });
            }
        };

        if let Some(err) = response.error {
            return Err(SessionError::CdpError {
                code: err.code,
                message: err.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enables a CDP domain (`"Network"`, `"Page"`) so it starts emitting
    /// events.
    ///
    /// # Errors
    ///
    /// See [`CdpClient::send_command`].
    pub async fn enable_domain(&self, domain: &str) -> Result<(), SessionError> {
        self.send_command(&format!("{domain}.enable"), serde_json::json!({}))
            .await?;
        Ok(())
    }

    /// Sends a close frame and stops the reader. The browser page stays open.
    pub async fn close(self) {
        if let Err(e) = self.writer.lock().await.close().await {
            tracing::debug!(error = %e, "error closing DevTools WebSocket");
        }
        self.reader_handle.abort();
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

/// Dispatches incoming messages: `id` → pending command, `method` → event.
async fn read_loop(
    mut reader: SplitStream<WsStream>,
    pending: PendingMap,
    event_tx: mpsc::UnboundedSender<CdpEvent>,
) {
    while let Some(msg_result) = reader.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                break;
            }
        };

        let text = match msg {
            Message::Text(t) => t.as_str().to_owned(),
            Message::Binary(b) => match String::from_utf8(b.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Message::Close(_) => {
                tracing::debug!("WebSocket closed by remote");
                break;
            }
            _ => continue,
        };

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse CDP message as JSON");
                continue;
            }
        };

        if let Some(id) = json.get("id").and_then(Value::as_u64) {
            let response = CdpResponse {
                result: json.get("result").cloned(),
                error: json
                    .get("error")
                    .and_then(|e| serde_json::from_value(e.clone()).ok()),
            };
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(response);
            } else {
                tracing::debug!(id, "response for unknown command id");
            }
        } else if let Some(method) = json.get("method").and_then(Value::as_str) {
            let event = CdpEvent {
                method: method.to_string(),
                params: json.get("params").cloned().unwrap_or(Value::Null),
            };
            // Nobody listening is fine.
            let _ = event_tx.send(event);
        }
    }

    // Fail every waiter instead of leaving it to time out.
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(CdpResponse {
            result: None,
            error: Some(CdpResponseError {
                code: -1,
                message: "WebSocket connection closed".to_string(),
            }),
        });
    }
}
