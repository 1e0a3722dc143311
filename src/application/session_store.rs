// In-memory share session store
use crate::application::error::ShareError;
use crate::domain::share::ShareSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

struct StoredSession {
    session: ShareSession,
    last_seen: Instant,
}

/// Sessions keyed by id. The lock is only ever held for short synchronous
/// sections, never across an `.await`.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, StoredSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, session: ShareSession) -> Uuid {
        let id = session.id;
        self.lock().insert(
            id,
            StoredSession {
                session,
                last_seen: Instant::now(),
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Result<ShareSession, ShareError> {
        let mut sessions = self.lock();
        let stored = sessions.get_mut(&id).ok_or(ShareError::SessionNotFound(id))?;
        stored.last_seen = Instant::now();
        Ok(stored.session.clone())
    }

    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut ShareSession) -> R) -> Result<R, ShareError> {
        let mut sessions = self.lock();
        let stored = sessions.get_mut(&id).ok_or(ShareError::SessionNotFound(id))?;
        stored.last_seen = Instant::now();
        Ok(f(&mut stored.session))
    }

    /// Drop a session. Refused while a snapshot is being created for it.
    pub fn remove(&self, id: Uuid) -> Result<(), ShareError> {
        let mut sessions = self.lock();
        let stored = sessions.get(&id).ok_or(ShareError::SessionNotFound(id))?;
        stored.session.can_close()?;
        sessions.remove(&id);
        Ok(())
    }

    /// Remove sessions untouched for longer than `idle`. Loading sessions are
    /// kept until their submit finishes. Returns how many were removed.
    pub fn purge_idle(&self, idle: Duration) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, stored| stored.session.is_loading() || stored.last_seen.elapsed() <= idle);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Clears a session's loading flag when dropped, whether the submit that
/// raised it finished or failed.
pub struct LoadingGuard {
    store: Arc<SessionStore>,
    id: Uuid,
}

impl LoadingGuard {
    pub fn new(store: Arc<SessionStore>, id: Uuid) -> Self {
        Self { store, id }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if self.store.update(self.id, |s| s.finish_loading()).is_err() {
            tracing::warn!(session = %self.id, "Session vanished while a snapshot was loading");
        }
    }
}
