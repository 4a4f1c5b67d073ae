//! The broadcast channel seam.
//!
//! A channel carries UTF-8 text frames to every other participant and
//! hands back whatever they send. Delivery is best effort: sending on a
//! closed channel drops the frame, nothing is queued for later.
//!
//! [`MemoryHub`] is an in-process implementation used by tests and by
//! anything that wants several whiteboards in one process.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

/// Something that happened on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel became usable. Fires again after every reconnect.
    Opened,
    /// A frame from another participant
    Message(String),
    Closed,
}

pub trait Channel {
    fn is_open(&self) -> bool;

    /// Send a frame to every other participant. Dropped silently when the
    /// channel is not open.
    fn send(&mut self, text: &str);

    /// Non-blocking check for the next event
    fn poll_event(&mut self) -> Option<ChannelEvent>;

    fn close(&mut self);
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn send(&mut self, text: &str) {
        (**self).send(text)
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        (**self).poll_event()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// A channel that never opens, for working offline
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineChannel;

impl Channel for OfflineChannel {
    fn is_open(&self) -> bool {
        false
    }

    fn send(&mut self, _text: &str) {}

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        None
    }

    fn close(&mut self) {}
}

#[derive(Debug, Default)]
struct HubState {
    next_endpoint: u64,
    inboxes: HashMap<u64, VecDeque<ChannelEvent>>,
    echo: bool,
}

/// In-process relay. Frames reach the endpoints connected at send time.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hub that also delivers each frame back to its sender, like a relay
    /// that broadcasts to everyone
    pub fn with_echo() -> Self {
        let hub = Self::default();
        hub.lock().echo = true;
        hub
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // a panicked test thread must not wedge the other endpoints
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self) -> u64 {
        let mut state = self.lock();
        let endpoint = state.next_endpoint;
        state.next_endpoint += 1;
        state
            .inboxes
            .insert(endpoint, VecDeque::from([ChannelEvent::Opened]));
        endpoint
    }

    /// Join the hub. The returned channel is open and its first event is
    /// [`ChannelEvent::Opened`].
    pub fn connect(&self) -> MemoryChannel {
        MemoryChannel {
            hub: self.clone(),
            endpoint: Some(self.register()),
            pending_closed: false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.lock().inboxes.len()
    }
}

/// One endpoint of a [`MemoryHub`]
#[derive(Debug)]
pub struct MemoryChannel {
    hub: MemoryHub,
    endpoint: Option<u64>,
    pending_closed: bool,
}

impl MemoryChannel {
    /// Drop the connection as a network failure would. Unlike
    /// [`Channel::close`] a `Closed` event is still observable.
    pub fn disconnect(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            self.hub.lock().inboxes.remove(&endpoint);
            self.pending_closed = true;
        }
    }

    /// Rejoin the hub under a fresh endpoint. Frames sent while away are
    /// not replayed.
    pub fn reconnect(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            self.hub.lock().inboxes.remove(&endpoint);
        }
        self.pending_closed = false;
        self.endpoint = Some(self.hub.register());
    }
}

impl Channel for MemoryChannel {
    fn is_open(&self) -> bool {
        self.endpoint.is_some()
    }

    fn send(&mut self, text: &str) {
        let Some(sender) = self.endpoint else {
            return;
        };
        let mut state = self.hub.lock();
        let echo = state.echo;
        let mut delivered = 0usize;
        for (endpoint, inbox) in state.inboxes.iter_mut() {
            if *endpoint != sender || echo {
                inbox.push_back(ChannelEvent::Message(text.to_string()));
                delivered += 1;
            }
        }
        trace!(sender, delivered, "hub frame");
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        match self.endpoint {
            Some(endpoint) => self.hub.lock().inboxes.get_mut(&endpoint)?.pop_front(),
            None if self.pending_closed => {
                self.pending_closed = false;
                Some(ChannelEvent::Closed)
            }
            None => None,
        }
    }

    fn close(&mut self) {
        if let Some(endpoint) = self.endpoint.take() {
            self.hub.lock().inboxes.remove(&endpoint);
        }
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.close();
    }
}
