//! In-process table of active sessions.
//!
//! Each entry is a cell holding the session behind an async mutex, so
//! operations on one call serialize while different calls never contend.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::session::{CallId, Session};

/// Shared handle to one session
pub type SessionCell = Arc<Mutex<Session>>;

/// Active sessions keyed by call id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<CallId, SessionCell>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: DashMap::with_capacity(64),
        }
    }

    /// Insert a cell unless the call already has one
    pub fn insert(&self, call_id: CallId, cell: SessionCell) -> bool {
        match self.sessions.entry(call_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(cell);
                true
            }
        }
    }

    /// Look up the cell for a call
    pub fn get(&self, call_id: &CallId) -> Option<SessionCell> {
        // Clone the Arc so no map guard is held across an await.
        self.sessions.get(call_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, call_id: &CallId) -> bool {
        self.sessions.contains_key(call_id)
    }

    /// Remove the entry only if it still holds `cell`
    ///
    /// A newer session started under the same id after cleanup is left alone.
    pub fn remove(&self, call_id: &CallId, cell: &SessionCell) -> bool {
        self.sessions
            .remove_if(call_id, |_, current| Arc::ptr_eq(current, cell))
            .is_some()
    }

    /// All cells, in no particular order
    pub fn cells(&self) -> Vec<SessionCell> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{FlowId, VoiceSettings};
    use chrono::Utc;

    fn cell(call_id: &str) -> SessionCell {
        Arc::new(Mutex::new(Session::new(
            CallId::from(call_id),
            FlowId::from("flow-1"),
            "+15550000000",
            VoiceSettings::default(),
            Utc::now(),
        )))
    }

    #[test]
    fn test_at_most_one_session_per_call() {
        let registry = SessionRegistry::new();
        assert!(registry.insert(CallId::from("a"), cell("a")));
        assert!(!registry.insert(CallId::from("a"), cell("a")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_requires_same_cell() {
        let registry = SessionRegistry::new();
        let first = cell("a");
        registry.insert(CallId::from("a"), first.clone());

        let stranger = cell("a");
        assert!(!registry.remove(&CallId::from("a"), &stranger));
        assert!(registry.contains(&CallId::from("a")));

        assert!(registry.remove(&CallId::from("a"), &first));
        assert!(!registry.remove(&CallId::from("a"), &first));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_for_distinct_calls() {
        let registry = Arc::new(SessionRegistry::new());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let id = format!("call-{}", i);
                    registry.insert(CallId(id.clone()), cell(&id))
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(registry.len(), 32);
        assert_eq!(registry.cells().len(), 32);
    }
}
