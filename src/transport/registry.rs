//! Session registry.
//!
//! Maps session ids to the write side of each open stream's event queue.
//! The registry never owns a connection: an entry is only a way to reach the
//! stream while it is open, so every write re-checks presence at call time.

use std::fmt;
use std::sync::Arc;

use axum::response::sse::Event;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Opaque identifier of one open event stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random id (UUID v4).
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Write side of a session's event queue.
pub type SessionHandle = UnboundedSender<Event>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Duplicate ids are rejected; the existing entry is left untouched.
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("session not found")]
    UnknownSession,
}

/// Concurrent map of live sessions.
///
/// Cloning is cheap and every clone shares the same map, so one registry is
/// created per server and handed to each handler through router state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session.
    pub fn register(&self, id: SessionId, handle: SessionHandle) -> Result<(), RegistryError> {
        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(())
            }
        }
    }

    /// Look up a session whose stream is still being read.
    pub fn lookup(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions
            .get(id)
            .filter(|handle| !handle.is_closed())
            .map(|handle| handle.value().clone())
    }

    /// Remove a session. Returns whether an entry was present.
    pub fn unregister(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Write one event into a session's stream.
    ///
    /// The shard guard is held across lookup and write, so a concurrent
    /// `unregister` either happens entirely before (and this returns
    /// `UnknownSession`) or entirely after the write.
    pub fn deliver(&self, id: &SessionId, event: Event) -> Result<(), DeliveryError> {
        let sent = {
            let handle = self.sessions.get(id).ok_or(DeliveryError::UnknownSession)?;
            handle.send(event).is_ok()
        };

        if sent {
            return Ok(());
        }

        // Reader is gone but its teardown has not run yet.
        self.sessions.remove_if(id, |_, handle| handle.is_closed());
        tracing::debug!(session_id = %id, "Dropped write to a closed stream");
        Err(DeliveryError::UnknownSession)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every entry. Streams whose queue loses its last writer end.
    pub fn clear(&self) {
        let count = self.sessions.len();
        self.sessions.clear();
        if count > 0 {
            tracing::info!(sessions = count, "Cleared session registry");
        }
    }
}
