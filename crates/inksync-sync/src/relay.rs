//! WebSocket fan-out relay.
//!
//! ```text
//! Client A ──┐                  ┌──► Client B
//!            ├── broadcast ─────┤
//! Client C ──┘                  └──► Client C (only with echo)
//! ```
//!
//! The relay forwards every text frame to every other connection and keeps
//! no document state. A client that connects late sees only frames sent
//! after it joined.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind_addr: String,
    /// Also deliver each frame back to its sender
    pub echo: bool,
    /// Frames buffered per connection before a slow reader starts losing them
    pub capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9160".to_string(),
            echo: false,
            capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub frames_relayed: u64,
    pub frames_dropped: u64,
}

#[derive(Default)]
struct AtomicRelayStats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    frames_relayed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl AtomicRelayStats {
    fn snapshot(&self) -> RelayStats {
        RelayStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            frames_relayed: self.frames_relayed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone)]
struct Frame {
    from: u64,
    text: Arc<str>,
}

pub struct RelayServer {
    listener: TcpListener,
    echo: bool,
    sender: broadcast::Sender<Frame>,
    stats: Arc<AtomicRelayStats>,
}

impl RelayServer {
    /// Bind the listening socket. Use port 0 to let the OS pick.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("failed to bind relay on {}", config.bind_addr))?;
        let (sender, _) = broadcast::channel(config.capacity.max(1));
        Ok(Self {
            listener,
            echo: config.echo,
            sender,
            stats: Arc::new(AtomicRelayStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for reading counters while the relay runs
    pub fn stats_handle(&self) -> RelayStatsHandle {
        RelayStatsHandle(self.stats.clone())
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr()?, echo = self.echo, "relay listening");
        let mut next_conn = 0u64;

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let conn = next_conn;
            next_conn += 1;
            debug!(%addr, conn, "new TCP connection");

            // subscribe before the handshake so nothing sent after the peer
            // sees its upgrade response is missed
            let receiver = self.sender.subscribe();
            let sender = self.sender.clone();
            let stats = self.stats.clone();
            let echo = self.echo;

            tokio::spawn(async move {
                stats.total_connections.fetch_add(1, Ordering::Relaxed);
                stats.active_connections.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = handle_connection(stream, conn, sender, receiver, &stats, echo).await {
                    warn!(%addr, conn, "connection error: {e}");
                }
                stats.active_connections.fetch_sub(1, Ordering::Relaxed);
                debug!(%addr, conn, "connection closed");
            });
        }
    }
}

#[derive(Clone)]
pub struct RelayStatsHandle(Arc<AtomicRelayStats>);

impl RelayStatsHandle {
    pub fn snapshot(&self) -> RelayStats {
        self.0.snapshot()
    }
}

async fn handle_connection(
    stream: TcpStream,
    conn: u64,
    sender: broadcast::Sender<Frame>,
    mut receiver: broadcast::Receiver<Frame>,
    stats: &AtomicRelayStats,
    echo: bool,
) -> Result<()> {
    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (mut ws_sink, mut ws_source) = ws_stream.split();

    loop {
        tokio::select! {
            incoming = ws_source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let frame = Frame { from: conn, text: Arc::from(text.as_str()) };
                    // no subscribers is not an error, the frame simply has nowhere to go
                    let _ = sender.send(frame);
                    stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(conn, bytes = data.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            outgoing = receiver.recv() => match outgoing {
                Ok(frame) => {
                    if frame.from == conn && !echo {
                        continue;
                    }
                    ws_sink.send(Message::Text(frame.text.to_string().into())).await?;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    stats.frames_dropped.fetch_add(missed, Ordering::Relaxed);
                    warn!(conn, missed, "slow connection, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let _ = ws_sink.close().await;
    Ok(())
}
