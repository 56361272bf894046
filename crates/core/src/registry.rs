//! Session Registry
//!
//! The registry is the single owner of every live session. It is constructed
//! once at startup and shared by reference with each connection; callers only
//! borrow a session for the duration of a single message.

use crate::session::{Session, SessionId, SessionSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A concurrency-safe map of session identifiers to sessions.
///
/// Every operation takes the lock for the duration of a single map access, so
/// no caller can hold it across an `.await`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session, replacing any entry with the same identifier.
    pub fn put(&self, session: Arc<Session>) {
        let id = session.id().clone();
        self.sessions.write().insert(id.clone(), session);
        debug!(session_id = %id, "Session registered");
    }

    /// Looks up a session without removing it.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Removes a session. Removing an unknown identifier is a no-op.
    pub fn delete(&self, id: &SessionId) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Snapshots of every live session, oldest first.
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().values().cloned().collect();
        let mut snapshots: Vec<SessionSnapshot> = sessions.iter().map(|s| s.snapshot()).collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }
}
