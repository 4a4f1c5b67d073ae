//! WebSocket client channel.
//!
//! The connection runs on its own thread with a single-threaded tokio
//! runtime. The owning thread talks to it through channels: frames go out
//! through an unbounded command queue and events come back through a std
//! channel drained by [`Channel::poll_event`]. Only `close` waits.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc as tokio_mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelEvent};

/// Connection settings for [`WsChannel`]
#[derive(Debug, Clone, PartialEq)]
pub struct WsChannelConfig {
    pub url: String,
    /// Wait this long and reconnect after the connection drops. `None`
    /// gives up after the first failure.
    pub reconnect_delay: Option<Duration>,
}

impl Default for WsChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9160".to_string(),
            reconnect_delay: Some(Duration::from_secs(2)),
        }
    }
}

/// How long [`Channel::close`] waits for queued frames to go out
const CLOSE_GRACE: Duration = Duration::from_millis(500);

enum WsCommand {
    Send(String),
    Close,
}

pub struct WsChannel {
    command_tx: tokio_mpsc::UnboundedSender<WsCommand>,
    event_rx: std_mpsc::Receiver<ChannelEvent>,
    open: bool,
    thread: JoinHandle<()>,
}

impl WsChannel {
    /// Start connecting in the background. The channel reports
    /// [`ChannelEvent::Opened`] once the handshake completes.
    pub fn connect(config: WsChannelConfig) -> Result<Self> {
        let (event_tx, event_rx) = std_mpsc::channel();
        let (command_tx, command_rx) = tokio_mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name("inksync-ws".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!("failed to start websocket runtime: {e}");
                        let _ = event_tx.send(ChannelEvent::Closed);
                        return;
                    }
                };
                rt.block_on(run_connection(config, event_tx, command_rx));
            })
            .context("failed to spawn websocket thread")?;

        Ok(Self {
            command_tx,
            event_rx,
            open: false,
            thread,
        })
    }
}

impl Channel for WsChannel {
    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, text: &str) {
        if self.open {
            let _ = self.command_tx.send(WsCommand::Send(text.to_string()));
        }
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        let event = self.event_rx.try_recv().ok()?;
        match event {
            ChannelEvent::Opened => self.open = true,
            ChannelEvent::Closed => self.open = false,
            ChannelEvent::Message(_) => {}
        }
        Some(event)
    }

    /// Close after flushing queued frames, waiting at most a short grace
    /// period for the connection thread to finish
    fn close(&mut self) {
        self.open = false;
        if self.command_tx.send(WsCommand::Close).is_err() {
            return;
        }
        let deadline = Instant::now() + CLOSE_GRACE;
        while !self.thread.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WsCommand::Close);
    }
}

/// Outcome of one connection attempt
enum Ended {
    /// The owner asked to close, or went away
    ByOwner,
    Dropped,
}

async fn run_connection(
    config: WsChannelConfig,
    event_tx: std_mpsc::Sender<ChannelEvent>,
    mut command_rx: tokio_mpsc::UnboundedReceiver<WsCommand>,
) {
    loop {
        let ended = match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!(url = %config.url, "websocket connected");
                if event_tx.send(ChannelEvent::Opened).is_err() {
                    return;
                }
                let ended = pump(ws_stream, &event_tx, &mut command_rx).await;
                let _ = event_tx.send(ChannelEvent::Closed);
                ended
            }
            Err(e) => {
                warn!(url = %config.url, "websocket connect failed: {e}");
                let _ = event_tx.send(ChannelEvent::Closed);
                Ended::Dropped
            }
        };

        if let Ended::ByOwner = ended {
            return;
        }
        let Some(delay) = config.reconnect_delay else {
            return;
        };

        // frames sent while disconnected are lost, not queued
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = command_rx.recv() => match command {
                    Some(WsCommand::Send(_)) => debug!("disconnected, dropping frame"),
                    Some(WsCommand::Close) | None => return,
                },
            }
        }
        debug!(url = %config.url, "reconnecting");
    }
}

async fn pump(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    event_tx: &std_mpsc::Sender<ChannelEvent>,
    command_rx: &mut tokio_mpsc::UnboundedReceiver<WsCommand>,
) -> Ended {
    let (mut ws_sink, mut ws_source) = ws_stream.split();

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(WsCommand::Send(text)) => {
                    if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                        warn!("websocket send failed: {e}");
                        return Ended::Dropped;
                    }
                }
                Some(WsCommand::Close) | None => {
                    let _ = ws_sink.close().await;
                    return Ended::ByOwner;
                }
            },
            incoming = ws_source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if event_tx.send(ChannelEvent::Message(text.as_str().to_owned())).is_err() {
                        return Ended::ByOwner;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("websocket closed by server");
                    return Ended::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("websocket read failed: {e}");
                    return Ended::Dropped;
                }
            },
        }
    }
}
