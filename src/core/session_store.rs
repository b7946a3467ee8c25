use crate::domain::model::{UserId, UserSession};
use crate::domain::ports::SessionStore;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Process-local session map. Sessions are lost on restart.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<UserId, UserSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, user_id: &UserId) -> Option<UserSession> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(user_id).cloned()
    }

    fn put(&self, session: UserSession) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(session.user_id.clone(), session);
    }

    fn remove(&self, user_id: &UserId) -> Option<UserSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(user_id)
    }

    fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
