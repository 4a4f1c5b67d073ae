//! Per-session client identity.
//!
//! Each running client picks one identifier at startup and keeps it for the
//! session's lifetime. It tags outbound deltas and lets the sync engine drop
//! its own deltas when a relay bounces them back. Nothing coordinates these
//! identifiers; a v4 UUID makes collisions negligible.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one client session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for logs and status lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A client session, holding the identity it publishes under
#[derive(Debug, Clone)]
pub struct Session {
    client_id: ClientId,
}

impl Session {
    /// Start a session with a fresh identity
    pub fn new() -> Self {
        Self::with_client_id(ClientId::generate())
    }

    /// Session with a fixed identity, for tests and replays
    pub fn with_client_id(client_id: ClientId) -> Self {
        Self { client_id }
    }

    /// Get the session's client id
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Whether a delta tagged with `origin` came from this session
    pub fn is_own(&self, origin: &ClientId) -> bool {
        &self.client_id == origin
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
