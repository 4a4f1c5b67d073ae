//! Delta replication over a [`Channel`].
//!
//! Outbound: every committed local change is stamped with this session's
//! client id and sent once, best effort. Nothing is queued while the
//! channel is down; a full sync on reconnect repairs what was missed.
//!
//! Inbound: frames are decoded, our own echoes dropped, and the delta is
//! applied straight to the live collection. Remote changes never touch
//! local undo history.

use inksync_core::Collection;
use inksync_session::{ClientId, Session};
use tracing::{debug, info, trace, warn};

use crate::channel::{Channel, ChannelEvent};
use crate::protocol::{Delta, DeltaKind, DeltaMessage};

/// What happened to one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    Applied(DeltaKind),
    /// Our own delta, bounced back by the relay
    Echo,
    /// Not a valid delta message
    Malformed,
    /// An update or delete for an element this client does not have
    Stale(DeltaKind),
}

/// Counters for one engine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub sent: u64,
    /// Deltas not sent because the channel was closed
    pub skipped: u64,
    pub applied: u64,
    pub echoes: u64,
    pub malformed: u64,
    pub stale: u64,
}

/// Summary of one [`SyncEngine::poll`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Remote deltas that changed the collection
    pub applied: usize,
    pub opened: bool,
    pub closed: bool,
}

impl PollSummary {
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

pub struct SyncEngine<C> {
    session: Session,
    channel: C,
    full_sync_on_reconnect: bool,
    opened_once: bool,
    stats: SyncStats,
}

impl<C: Channel> SyncEngine<C> {
    /// Create an engine publishing as `session` over `channel`
    pub fn new(session: Session, channel: C) -> Self {
        Self {
            session,
            channel,
            full_sync_on_reconnect: true,
            opened_once: false,
            stats: SyncStats::default(),
        }
    }

    pub fn with_full_sync_on_reconnect(mut self, enabled: bool) -> Self {
        self.full_sync_on_reconnect = enabled;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client_id(&self) -> &ClientId {
        self.session.client_id()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Send a delta if the channel is open. Returns whether it was sent.
    pub fn publish(&mut self, delta: Delta) -> bool {
        let kind = delta.kind();
        if !self.channel.is_open() {
            self.stats.skipped += 1;
            debug!(%kind, "channel not open, delta not sent");
            return false;
        }

        let message = DeltaMessage::new(self.session.client_id().clone(), delta);
        match message.encode() {
            Ok(text) => {
                self.channel.send(&text);
                self.stats.sent += 1;
                trace!(%kind, bytes = text.len(), "published delta");
                true
            }
            Err(e) => {
                warn!(%kind, "failed to encode delta: {e}");
                false
            }
        }
    }

    /// Broadcast the entire collection
    pub fn publish_full(&mut self, collection: &Collection) -> bool {
        self.publish(Delta::Full {
            elements: collection.elements().to_vec(),
        })
    }

    /// Decode one frame and apply it to `collection`
    pub fn apply_inbound(&mut self, raw: &str, collection: &mut Collection) -> InboundOutcome {
        let message = match DeltaMessage::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                self.stats.malformed += 1;
                warn!(bytes = raw.len(), "discarding malformed delta: {e}");
                return InboundOutcome::Malformed;
            }
        };

        if self.session.is_own(&message.client_id) {
            self.stats.echoes += 1;
            trace!(kind = %message.delta.kind(), "dropping own echo");
            return InboundOutcome::Echo;
        }

        let kind = message.delta.kind();
        let changed = match message.delta {
            Delta::Add { element } => {
                collection.append(element);
                true
            }
            Delta::Update { element } => collection.merge_update(element),
            Delta::Delete { id } => collection.remove(&id).is_some(),
            Delta::Full { elements } => {
                collection.replace_all(elements);
                true
            }
        };

        if changed {
            self.stats.applied += 1;
            debug!(%kind, from = message.client_id.short(), "applied remote delta");
            InboundOutcome::Applied(kind)
        } else {
            self.stats.stale += 1;
            debug!(%kind, from = message.client_id.short(), "remote delta targets unknown element");
            InboundOutcome::Stale(kind)
        }
    }

    /// Drain pending channel events into `collection`
    pub fn poll(&mut self, collection: &mut Collection) -> PollSummary {
        let mut summary = PollSummary::default();
        while let Some(event) = self.channel.poll_event() {
            match event {
                ChannelEvent::Opened => {
                    summary.opened = true;
                    let reconnect = self.opened_once;
                    self.opened_once = true;
                    info!(client = self.session.client_id().short(), reconnect, "channel open");
                    if reconnect && self.full_sync_on_reconnect {
                        self.publish_full(collection);
                    }
                }
                ChannelEvent::Message(text) => {
                    if let InboundOutcome::Applied(_) = self.apply_inbound(&text, collection) {
                        summary.applied += 1;
                    }
                }
                ChannelEvent::Closed => {
                    summary.closed = true;
                    info!(client = self.session.client_id().short(), "channel closed");
                }
            }
        }
        summary
    }

    /// Close the channel. Later publishes are skipped.
    pub fn close(&mut self) {
        self.channel.close();
    }
}
