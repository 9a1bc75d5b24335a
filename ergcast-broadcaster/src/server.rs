use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::broadcaster::EventBroadcaster;
use crate::error::{BroadcasterError, Result};
use crate::message::WireMessage;
use crate::subscriber::ChannelSubscriber;

pub const WELCOME_TEXT: &str = "Welcome to ErgCast Server!";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
    /// Messages buffered per client before it counts as lagging
    pub queue_capacity: usize,
    /// Per-message send deadline
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            queue_capacity: 1024,
            send_timeout: Duration::from_millis(500),
        }
    }
}

/// WebSocket front end: every accepted client becomes a channel subscriber on
/// the shared broadcaster, drained by its own task.
pub struct WebSocketServer {
    config: ServerConfig,
    broadcaster: Arc<EventBroadcaster>,
    local_addr: parking_lot::Mutex<Option<SocketAddr>>,
    accept_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    client_tasks: Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
    running: Arc<AtomicBool>,
}

impl WebSocketServer {
    pub fn new(config: ServerConfig, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            config,
            broadcaster,
            local_addr: parking_lot::Mutex::new(None),
            accept_task: Arc::new(Mutex::new(None)),
            client_tasks: Arc::new(parking_lot::Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind and start accepting clients. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BroadcasterError::AlreadyRunning);
        }

        let listener = match TcpListener::bind((self.config.host.as_str(), self.config.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        let addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(addr);

        tracing::info!("WebSocket server listening on ws://{}", addr);

        let broadcaster = Arc::clone(&self.broadcaster);
        let clients = Arc::clone(&self.client_tasks);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::info!("Client connected from {}", peer);
                        let handle = tokio::spawn(serve_client(
                            stream,
                            peer,
                            Arc::clone(&broadcaster),
                            config.clone(),
                        ));

                        let mut clients = clients.lock();
                        clients.retain(|h| !h.is_finished());
                        clients.push(handle);
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept client: {}", e);
                    }
                }
            }
            tracing::info!("Client acceptance task stopped");
        });

        *self.accept_task.lock().await = Some(task);

        Ok(addr)
    }

    /// Stop accepting and wait (bounded) for client tasks to flush and exit.
    ///
    /// Client tasks finish once their subscription is closed, so callers
    /// normally run [`EventBroadcaster::close_all`] first.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(BroadcasterError::NotStarted);
        }

        if let Some(task) = self.accept_task.lock().await.take() {
            task.abort();
        }

        // One deadline shared by all clients
        let mut handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.client_tasks.lock());
        let drained = tokio::time::timeout(
            self.config.send_timeout,
            futures::future::join_all(handles.iter_mut()),
        )
        .await;
        if drained.is_err() {
            let stuck: Vec<_> = handles.iter().filter(|h| !h.is_finished()).collect();
            tracing::warn!("Aborting {} client task(s) that did not finish", stuck.len());
            for handle in stuck {
                handle.abort();
            }
        }

        *self.local_addr.lock() = None;
        tracing::info!("WebSocket server stopped");
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    broadcaster: Arc<EventBroadcaster>,
    config: ServerConfig,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // Welcome goes to this client only
    let welcome = match WireMessage::text(WELCOME_TEXT).to_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode welcome: {}", e);
            return;
        }
    };
    match tokio::time::timeout(config.send_timeout, write.send(Message::Text(welcome))).await {
        Ok(Ok(())) => {}
        _ => {
            tracing::warn!("Could not greet {}, dropping", peer);
            return;
        }
    }

    let (subscriber, mut rx) = ChannelSubscriber::new(config.queue_capacity, format!("ws {}", peer));
    let id = broadcaster.subscribe(subscriber);

    loop {
        tokio::select! {
            biased;

            outgoing = rx.recv() => match outgoing {
                Some(json) => {
                    let send = write.send(Message::Text(json.to_string()));
                    match tokio::time::timeout(config.send_timeout, send).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!("Send to {} failed: {}", peer, e);
                            break;
                        }
                        Err(_) => {
                            tracing::warn!("Send to {} timed out after {:?}", peer, config.send_timeout);
                            break;
                        }
                    }
                }
                None => {
                    // Subscription closed by the broadcaster
                    let _ = tokio::time::timeout(config.send_timeout, write.send(Message::Close(None))).await;
                    break;
                }
            },

            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("Read from {} failed: {}", peer, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    broadcaster.unsubscribe(id);
    tracing::info!("Client {} disconnected", peer);
}
