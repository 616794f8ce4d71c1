//! In-process DevTools endpoint for session tests.
//!
//! Accepts one WebSocket connection. Commands get an empty result, except
//! `Runtime.evaluate`: it echoes the expression back as the value, reports an
//! exception for `"throw"` and never answers `"hang"`.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

enum Outgoing {
    Frame(Value),
    Close,
}

pub(crate) struct MockDevtools {
    pub ws_url: String,
    requests: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl MockDevtools {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    msg = stream.next() => {
                        let Some(Ok(Message::Text(text))) = msg else { break };
                        let Ok(frame) = serde_json::from_str::<Value>(&text) else { continue };
                        let reply = reply_to(&frame);
                        let _ = requests_tx.send(frame);
                        if let Some(reply) = reply {
                            if sink.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    out = outgoing_rx.recv() => match out {
                        Some(Outgoing::Frame(frame)) => {
                            if sink.send(Message::Text(frame.to_string())).await.is_err() {
                                break;
                            }
                        }
                        Some(Outgoing::Close) | None => {
                            let _ = sink.close().await;
                            break;
                        }
                    }
                }
            }
        });

        Self {
            ws_url: format!("ws://{}", addr),
            requests,
            outgoing,
        }
    }

    /// Send an event frame to the client.
    pub fn push(&self, frame: Value) {
        let _ = self.outgoing.send(Outgoing::Frame(frame));
    }

    /// Close the connection from the browser side.
    pub fn close(&self) {
        let _ = self.outgoing.send(Outgoing::Close);
    }

    /// Wait up to 5 s for the next request with `method`, skipping others.
    pub async fn next_request(&mut self, method: &str) -> Option<Value> {
        let requests = &mut self.requests;
        tokio::time::timeout(Duration::from_secs(5), async move {
            while let Some(frame) = requests.recv().await {
                if frame.get("method").and_then(Value::as_str) == Some(method) {
                    return Some(frame);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    /// Requests received and not yet consumed.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.requests.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

/// A main-frame `Page.frameNavigated` event.
pub(crate) fn frame_navigated(frame: Value) -> Value {
    json!({ "method": "Page.frameNavigated", "params": { "frame": frame } })
}

fn reply_to(frame: &Value) -> Option<Value> {
    let id = frame.get("id")?.clone();
    let result = match frame.get("method")?.as_str()? {
        "Runtime.evaluate" => {
            let expression = frame.get("params")?.get("expression")?.as_str()?;
            match expression {
                "hang" => return None,
                "throw" => json!({
                    "result": { "type": "object", "subtype": "error" },
                    "exceptionDetails": { "text": "Uncaught" }
                }),
                _ => json!({ "result": { "type": "string", "value": expression } }),
            }
        }
        "Page.navigate" => json!({ "frameId": "F1", "loaderId": "L1" }),
        _ => json!({}),
    };
    Some(json!({ "id": id, "result": result }))
}
