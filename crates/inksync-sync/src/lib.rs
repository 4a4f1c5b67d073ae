//! Delta replication for inksync.
//!
//! - [`Whiteboard`]: one client's collection, undo history and gesture
//!   state, driven by [`Command`]s
//! - [`SyncEngine`]: stamps, sends and applies deltas over a [`Channel`]
//! - [`MemoryHub`], [`WsChannel`], [`RelayServer`]: in-process and
//!   WebSocket transports

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod whiteboard;
pub mod ws;

pub use channel::{Channel, ChannelEvent, MemoryChannel, MemoryHub, OfflineChannel};
pub use config::SyncConfig;
pub use engine::{InboundOutcome, PollSummary, SyncEngine, SyncStats};
pub use error::WhiteboardError;
pub use protocol::{Delta, DeltaKind, DeltaMessage};
pub use relay::{RelayConfig, RelayServer, RelayStats, RelayStatsHandle};
pub use whiteboard::{Command, Outcome, Whiteboard};
pub use ws::{WsChannel, WsChannelConfig};
