//! Tunables for a whiteboard session.

use std::time::Duration;

use inksync_core::DEFAULT_MOVE_INTERVAL;
use inksync_session::DEFAULT_HISTORY_DEPTH;

/// Configuration for sync behavior
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Pointer moves inside this window are coalesced
    pub move_interval: Duration,
    /// Undo snapshots kept per client
    pub history_depth: usize,
    /// Broadcast undo, redo, clear and load as full syncs
    pub broadcast_history: bool,
    /// Send the whole collection each time the channel reopens
    pub full_sync_on_reconnect: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            move_interval: DEFAULT_MOVE_INTERVAL,
            history_depth: DEFAULT_HISTORY_DEPTH,
            broadcast_history: true,
            full_sync_on_reconnect: true,
        }
    }
}
