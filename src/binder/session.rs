//! Session read contract and an in-memory store.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;

/// Server-side per-client key/value storage.
///
/// Implementations must tolerate concurrent `get`/`put` from many workers.
/// The binder only ever calls [`SessionStore::get`].
pub trait SessionStore: Send + Sync {
    /// Value stored under `key` for `session_id`.
    fn get(&self, session_id: &str, key: &str) -> Option<Value>;

    /// Store `value` under `key`, creating the session if needed.
    fn put(&self, session_id: &str, key: &str, value: Value);
}

/// Fresh opaque session identifier.
#[must_use]
pub fn new_session_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Process-local [`SessionStore`] backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, HashMap<String, Value>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty session and return its id.
    #[must_use]
    pub fn create(&self) -> String {
        let id = new_session_id();
        self.sessions.insert(id.clone(), HashMap::new());
        id
    }

    /// Drop a session; returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str, key: &str) -> Option<Value> {
        self.sessions
            .get(session_id)
            .and_then(|session| session.get(key).cloned())
    }

    fn put(&self, session_id: &str, key: &str, value: Value) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}
