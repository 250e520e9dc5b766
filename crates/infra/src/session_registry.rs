use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub killed: bool,
    pub killed_at: Option<DateTime<Utc>>,
    pub killed_reason: Option<String>,
    pub call_count: u64,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            created_at: Utc::now(),
            killed: false,
            killed_at: None,
            killed_reason: None,
            call_count: 0,
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<String, Session>,
    order: Vec<String>,
}

impl RegistryInner {
    fn entry(&mut self, session_id: &str) -> &mut Session {
        if !self.sessions.contains_key(session_id) {
            debug!(session_id, "Session created");
            self.order.push(session_id.to_string());
        }
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id))
    }
}

/// Per-session lifecycle and call counters.
///
/// Sessions come into existence the first time they are referenced. A kill is
/// terminal: there is no way to clear it for the same id.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, session_id: &str) -> Session {
        self.inner.lock().entry(session_id).clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.inner.lock().sessions.get(session_id).cloned()
    }

    /// Count one call and return the session as it stands after the increment.
    /// The kill flag in the returned value is authoritative for that call.
    pub fn record_call(&self, session_id: &str) -> Session {
        let mut inner = self.inner.lock();
        let session = inner.entry(session_id);
        session.call_count += 1;
        session.clone()
    }

    /// Kill a session. Killing an already-killed session leaves the original
    /// timestamp and reason in place.
    pub fn kill(&self, session_id: &str, reason: &str) -> Session {
        let mut inner = self.inner.lock();
        let session = inner.entry(session_id);
        if !session.killed {
            session.killed = true;
            session.killed_at = Some(Utc::now());
            session.killed_reason = Some(reason.to_string());
            info!(session_id, reason, "Session killed");
        }
        session.clone()
    }

    pub fn is_killed(&self, session_id: &str) -> bool {
        self.inner
            .lock()
            .sessions
            .get(session_id)
            .is_some_and(|s| s.killed)
    }

    /// Session ids in creation order.
    pub fn list(&self) -> Vec<String> {
        self.inner.lock().order.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
