use crate::error::{BridgeError, Result};
use crate::page::channel::{Completion, ExecutionChannel, PageEvent};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Value>>>>;

/// Upper bound on a single protocol round-trip.
const COMMAND_TIMEOUT_SECS: u64 = 30;

/// Attach attempts while the browser is still starting.
const MAX_RETRIES: u32 = 30;

/// DevTools session attached to the player page target.
///
/// Cheap to clone; every clone talks over the same WebSocket.
#[derive(Clone)]
pub struct CdpSession {
    /// WebSocket sender
    ws_tx: Arc<Mutex<WsSink>>,
    /// In-flight commands by message id
    responses: Pending,
    /// Page lifecycle events
    events: broadcast::Sender<PageEvent>,
    /// Message ID counter
    msg_id: Arc<Mutex<u32>>,
    /// Cleared by the read loop when the socket goes away
    alive: Arc<AtomicBool>,
    /// DevTools port being used
    port: u16,
}

impl CdpSession {
    /// Attach to the first page target of the browser listening on `port`,
    /// retrying while the browser is still coming up.
    pub async fn attach(port: u16) -> Result<Self> {
        let mut last_error = String::new();

        for attempt in 1..=MAX_RETRIES {
            match Self::try_attach(port).await {
                Ok(session) => return Ok(session),
                Err(e) => last_error = e.to_string(),
            }
            tracing::debug!("Attach retry {}/{}: {}", attempt, MAX_RETRIES, last_error);
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        Err(BridgeError::Channel(format!(
            "Failed to attach to DevTools on port {} after {} retries: {}",
            port, MAX_RETRIES, last_error
        )))
    }

    async fn try_attach(port: u16) -> Result<Self> {
        let ws_url = find_page_target(port).await?;
        Self::connect(&ws_url, port).await
    }

    /// Open the page target's WebSocket and enable the domains we listen to.
    pub(crate) async fn connect(ws_url: &str, port: u16) -> Result<Self> {
        tracing::info!("Connecting to page target WebSocket: {}", ws_url);

        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| BridgeError::Channel(format!("Failed to connect WebSocket: {}", e)))?;
        let (tx, rx) = StreamExt::split(ws_stream);

        let (events, _) = broadcast::channel(64);
        let session = Self {
            ws_tx: Arc::new(Mutex::new(tx)),
            responses: Arc::new(Mutex::new(HashMap::new())),
            events,
            msg_id: Arc::new(Mutex::new(1)),
            alive: Arc::new(AtomicBool::new(true)),
            port,
        };

        tokio::spawn(read_loop(
            rx,
            session.responses.clone(),
            session.events.clone(),
            session.alive.clone(),
        ));

        session.send_command("Page.enable", json!({})).await?;
        session.send_command("Runtime.enable", json!({})).await?;
        tracing::info!("DevTools session attached on port {}", port);

        Ok(session)
    }

    /// Subscribe to page lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.events.subscribe()
    }

    /// Send a CDP command and wait for its response
    async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        let (id, rx) = {
            let mut msg_id = self.msg_id.lock().await;
            let id = *msg_id;
            *msg_id += 1;

            let (tx, rx) = oneshot::channel();
            self.responses.lock().await.insert(id, tx);
            (id, rx)
        };

        // Registered after the read loop's final clear; nothing would answer it
        if !self.alive.load(Ordering::SeqCst) {
            self.responses.lock().await.remove(&id);
            return Err(BridgeError::Channel(format!(
                "Connection closed before {} was sent",
                method
            )));
        }

        let command = json!({
            "id": id,
            "method": method,
            "params": params
        });

        let sent = self
            .ws_tx
            .lock()
            .await
            .send(WsMessage::Text(command.to_string()))
            .await;
        if let Err(e) = sent {
            self.responses.lock().await.remove(&id);
            return Err(BridgeError::Channel(format!(
                "Failed to send {}: {}",
                method, e
            )));
        }

        let response = match tokio::time::timeout(
            tokio::time::Duration::from_secs(COMMAND_TIMEOUT_SECS),
            rx,
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(BridgeError::Channel(format!(
                    "Connection closed before {} completed",
                    method
                )))
            }
            Err(_) => {
                self.responses.lock().await.remove(&id);
                return Err(BridgeError::Channel(format!("{} timed out", method)));
            }
        };

        if let Some(error) = response.get("error") {
            return Err(BridgeError::Channel(format!("{} failed: {}", method, error)));
        }
        Ok(response)
    }

    /// Navigate the page. A navigation the browser refuses outright is
    /// reported to subscribers as a failed load.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let response = self
            .send_command("Page.navigate", json!({ "url": url }))
            .await?;

        if let Some(error_text) = response
            .get("result")
            .and_then(|r| r.get("errorText"))
            .and_then(|v| v.as_str())
        {
            tracing::warn!("Navigation to {} failed: {}", url, error_text);
            let _ = self.events.send(PageEvent::Loaded { ok: false });
            return Ok(());
        }

        tracing::info!("Navigated to: {}", url);
        Ok(())
    }

    /// Evaluate `expression` in the page and return its value by value.
    /// `None` when the script threw or the session went away.
    pub async fn evaluate(&self, expression: &str) -> Option<Value> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true
                }),
            )
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Evaluation abandoned: {}", e);
                return None;
            }
        };

        let result = response.get("result")?;
        if let Some(details) = result.get("exceptionDetails") {
            tracing::debug!(
                "Evaluation threw: {}",
                details
                    .get("text")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown exception")
            );
            return None;
        }

        Some(
            result
                .get("result")
                .and_then(|r| r.get("value"))
                .cloned()
                .unwrap_or(Value::Null),
        )
    }

    /// Close the WebSocket. Pending and later submissions resolve to `None`.
    pub async fn close(&self) {
        let _ = self.ws_tx.lock().await.close().await;
        tracing::info!("DevTools session closed on port {}", self.port);
    }
}

impl ExecutionChannel for CdpSession {
    fn submit(&self, script: String) -> Completion {
        let session = self.clone();
        Box::pin(async move { session.evaluate(&script).await })
    }
}

/// Look up the WebSocket debugger URL of the first page target.
async fn find_page_target(port: u16) -> Result<String> {
    let list_url = format!("http://127.0.0.1:{}/json/list", port);

    let response = reqwest::get(&list_url)
        .await
        .map_err(|e| BridgeError::Channel(format!("Connection error: {}", e)))?;
    if !response.status().is_success() {
        return Err(BridgeError::Channel(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    let targets: Value = response
        .json()
        .await
        .map_err(|e| BridgeError::Channel(format!("Failed to parse targets response: {}", e)))?;

    page_target_ws_url(&targets)
        .ok_or_else(|| BridgeError::Channel("No page target found".to_string()))
}

fn page_target_ws_url(targets: &Value) -> Option<String> {
    targets
        .as_array()?
        .iter()
        .filter(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
        .find_map(|t| t.get("webSocketDebuggerUrl").and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Route responses to their waiters and translate page events until the
/// socket closes. Dropping the pending senders on exit resolves every
/// outstanding submission to "no value".
async fn read_loop(
    mut rx: SplitStream<WsStream>,
    responses: Pending,
    events: broadcast::Sender<PageEvent>,
    alive: Arc<AtomicBool>,
) {
    while let Some(msg) = rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                tracing::trace!("WS received: {}", text.chars().take(100).collect::<String>());
                let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                if let Some(id) = frame.get("id").and_then(|i| i.as_u64()) {
                    if let Some(sender) = responses.lock().await.remove(&(id as u32)) {
                        let _ = sender.send(frame);
                    }
                } else if let Some(event) = page_event(&frame) {
                    let _ = events.send(event);
                }
            }
            Ok(WsMessage::Close(_)) => {
                tracing::debug!("WebSocket closed");
                break;
            }
            Err(e) => {
                tracing::debug!("WebSocket error: {:?}", e);
                break;
            }
            _ => {}
        }
    }

    alive.store(false, Ordering::SeqCst);
    responses.lock().await.clear();
    let _ = events.send(PageEvent::Detached);
}

/// Map a protocol event frame to a page event, if it is one we track.
fn page_event(frame: &Value) -> Option<PageEvent> {
    match frame.get("method")?.as_str()? {
        "Page.loadEventFired" => Some(PageEvent::Loaded { ok: true }),
        "Page.frameNavigated" => {
            let frame = frame.get("params")?.get("frame")?;
            if frame.get("parentId").is_some() {
                return None;
            }
            // A failed load commits Chrome's error page; report what was asked for
            let url = frame
                .get("unreachableUrl")
                .or_else(|| frame.get("url"))?
                .as_str()?;
            Some(PageEvent::Navigated {
                url: url.to_string(),
            })
        }
        "Inspector.detached" => Some(PageEvent::Detached),
        _ => None,
    }
}
