//! Chat session registry
//!
//! Owns the connection-id to session mapping behind a single lock and
//! exposes only atomic operations. The lock is held for map mutation or
//! snapshotting, never across I/O.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::constants::DEFAULT_NICKNAME;
use crate::error::Result;

/// State for one connected chat client. The outbound sender feeds the
/// bounded queue drained by that connection's own task, which is the
/// only writer to the socket.
pub struct Session {
    pub id: Uuid,
    pub nickname: String,
    pub outbound: mpsc::Sender<String>,
}

/// Thread-safe mapping of connection identity to session state
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection under a fresh id with the default nickname.
    pub fn register(&self, outbound: mpsc::Sender<String>) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let session = Session {
            id,
            nickname: DEFAULT_NICKNAME.to_string(),
            outbound,
        };
        self.sessions.lock()?.insert(id, session);
        Ok(id)
    }

    /// Atomically swap a session's nickname.
    ///
    /// The new name is trimmed first; a name that is empty after trimming
    /// is a no-op. Returns the (old, new) pair on an effective rename so
    /// the caller can broadcast a notification.
    pub fn rename(&self, id: Uuid, new_nickname: &str) -> Result<Option<(String, String)>> {
        let new_nickname = new_nickname.trim();
        if new_nickname.is_empty() {
            return Ok(None);
        }

        let mut sessions = self.sessions.lock()?;
        Ok(sessions.get_mut(&id).map(|session| {
            let old = std::mem::replace(&mut session.nickname, new_nickname.to_string());
            (old, new_nickname.to_string())
        }))
    }

    /// Current nickname of a session, if it is still registered.
    pub fn nickname(&self, id: Uuid) -> Result<Option<String>> {
        let sessions = self.sessions.lock()?;
        Ok(sessions.get(&id).map(|session| session.nickname.clone()))
    }

    /// Remove a session. Removing an absent session is a no-op.
    pub fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions.lock()?.remove(&id);
        Ok(())
    }

    /// Stable copy of every registered session's id and outbound sender,
    /// safe to iterate without holding the lock.
    pub fn snapshot(&self) -> Result<Vec<(Uuid, mpsc::Sender<String>)>> {
        let sessions = self.sessions.lock()?;
        Ok(sessions
            .values()
            .map(|session| (session.id, session.outbound.clone()))
            .collect())
    }

    /// Get current session count
    pub fn count(&self) -> Result<usize> {
        Ok(self.sessions.lock()?.len())
    }

    /// Drop every session, closing each connection's outbound queue.
    /// Used once at shutdown.
    pub fn clear(&self) -> Result<()> {
        self.sessions.lock()?.clear();
        Ok(())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
