// WebSocket driver for one connection attempt (one generation).
// Reports Opened / Frame / Closed into the event loop; never touches shared state.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use url::Url;

use super::Generation;

/// Path of the push endpoint relative to the dashboard origin.
pub const PUSH_PATH: &str = "/api/ws";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Frame(String),
    /// Connect failure, error, or close; carries a human-readable reason.
    Closed(String),
}

/// Push URL for a dashboard origin: `http → ws`, `https → wss`, same host and port.
pub fn push_url(base: &Url) -> anyhow::Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => anyhow::bail!("cannot derive push URL from scheme {:?}", other),
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot switch {} to {}", base, scheme))?;
    url.set_path(PUSH_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Live socket task for one generation. Dropping the handle also closes the socket.
pub struct SocketHandle {
    generation: Generation,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Ask the task to send a Close frame and exit.
    pub fn close(self) -> JoinHandle<()> {
        let _ = self.close_tx.send(());
        self.task
    }
}

pub fn spawn<T>(
    url: Url,
    generation: Generation,
    connect_timeout: Duration,
    tx: mpsc::Sender<T>,
) -> SocketHandle
where
    T: From<(Generation, SocketEvent)> + Send + 'static,
{
    let (close_tx, close_rx) = oneshot::channel();
    let task = tokio::spawn(run(url, generation, connect_timeout, tx, close_rx));
    SocketHandle {
        generation,
        close_tx,
        task,
    }
}

async fn run<T>(
    url: Url,
    generation: Generation,
    connect_timeout: Duration,
    tx: mpsc::Sender<T>,
    mut close_rx: oneshot::Receiver<()>,
) where
    T: From<(Generation, SocketEvent)> + Send + 'static,
{
    let emit = |event: SocketEvent| T::from((generation, event));

    let connect = tokio::time::timeout(connect_timeout, connect_async(url.as_str()));
    let ws = tokio::select! {
        _ = &mut close_rx => return,
        result = connect => match result {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => {
                warn!(error = %e, %url, %generation, operation = "ws_connect", "push channel connect failed");
                let _ = tx.send(emit(SocketEvent::Closed(e.to_string()))).await;
                return;
            }
            Err(_) => {
                warn!(%url, %generation, operation = "ws_connect", "push channel connect timed out");
                let _ = tx.send(emit(SocketEvent::Closed("connect timed out".into()))).await;
                return;
            }
        }
    };
    info!(%url, %generation, "push channel open");
    if tx.send(emit(SocketEvent::Opened)).await.is_err() {
        return;
    }

    let (mut write, mut read) = ws.split();
    let reason = loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = write.send(WsMessage::Close(None)).await;
                debug!(%generation, "push channel closed locally");
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    if tx.send(emit(SocketEvent::Frame(text))).await.is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    break match frame {
                        Some(f) => format!("closed by server ({}): {}", u16::from(f.code), f.reason),
                        None => "closed by server".to_string(),
                    };
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    debug!(len = data.len(), "binary push frame ignored");
                }
                // Ping/Pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_string(),
            }
        }
    };
    warn!(%generation, reason = %reason, "push channel closed");
    let _ = tx.send(emit(SocketEvent::Closed(reason))).await;
}
