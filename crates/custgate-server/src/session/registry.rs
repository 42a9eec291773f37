//! Session identifier to remote-session mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use custgate_remote::RemoteSession;
use parking_lot::Mutex;

use crate::metrics;

/// Opaque token correlating a caller with one remote session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Returns `None` for an empty identifier.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live remote sessions keyed by [`SessionId`].
///
/// A single mutex guards the whole map and is never held across an await.
/// Entries are only replaced (last write wins) or dropped wholesale by
/// [`SessionRegistry::clear`].
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<dyn RemoteSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `id`. Returns `true` if an earlier session
    /// was replaced.
    pub fn put(&self, id: SessionId, session: Arc<dyn RemoteSession>) -> bool {
        let mut sessions = self.sessions.lock();
        let replaced = sessions.insert(id, session).is_some();
        metrics::set_sessions(sessions.len());
        replaced
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<dyn RemoteSession>> {
        self.sessions.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Release every session. Returns how many were held.
    pub fn clear(&self) -> usize {
        let drained: Vec<_> = {
            let mut sessions = self.sessions.lock();
            sessions.drain().collect()
        };
        metrics::set_sessions(0);
        drained.len()
    }
}
