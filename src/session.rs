//! In-memory conversation sessions.

use crate::error::{Result, SyllabusError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
struct Turn {
    user: String,
    assistant: String,
}

#[derive(Default)]
struct Sessions {
    next_id: u64,
    history: HashMap<String, Vec<Turn>>,
    /// Session ids, oldest first.
    order: VecDeque<String>,
}

impl Sessions {
    fn insert(&mut self, id: &str, max_sessions: usize) -> &mut Vec<Turn> {
        if !self.history.contains_key(id) {
            while self.order.len() >= max_sessions.max(1) {
                if let Some(oldest) = self.order.pop_front() {
                    debug!("Evicting {}", oldest);
                    self.history.remove(&oldest);
                }
            }
            self.order.push_back(id.to_string());
        }
        self.history.entry(id.to_string()).or_default()
    }
}

/// Conversation history per session, keeping the last `max_history` exchanges.
///
/// At most `max_sessions` sessions are held; creating one more drops the
/// oldest.
pub struct SessionStore {
    max_history: usize,
    max_sessions: usize,
    inner: Mutex<Sessions>,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            max_sessions: 1000,
            inner: Mutex::new(Sessions::default()),
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn lock(&self) -> Result<MutexGuard<'_, Sessions>> {
        self.inner
            .lock()
            .map_err(|e| SyllabusError::Session(format!("Failed to acquire lock: {}", e)))
    }

    /// Start a new session and return its id (`session_1`, `session_2`, ...).
    pub fn create_session(&self) -> Result<String> {
        let mut sessions = self.lock()?;
        sessions.next_id += 1;
        let id = format!("session_{}", sessions.next_id);
        sessions.insert(&id, self.max_sessions);
        debug!("Created {}", id);
        Ok(id)
    }

    /// Record one question/answer pair. Unknown ids start a new history.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        let turns = sessions.insert(session_id, self.max_sessions);
        turns.push(Turn {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });

        if turns.len() > self.max_history {
            let excess = turns.len() - self.max_history;
            turns.drain(..excess);
        }
        Ok(())
    }

    /// Formatted history, or `None` when the session is unknown or empty.
    pub fn get_history(&self, session_id: &str) -> Result<Option<String>> {
        let sessions = self.lock()?;
        let history = sessions
            .history
            .get(session_id)
            .filter(|turns| !turns.is_empty())
            .map(|turns| {
                turns
                    .iter()
                    .map(|t| format!("User: {}\nAssistant: {}", t.user, t.assistant))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        Ok(history)
    }

    pub fn clear_session(&self, session_id: &str) -> Result<()> {
        if let Some(turns) = self.lock()?.history.get_mut(session_id) {
            turns.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_increase() {
        let store = SessionStore::new(2);
        assert_eq!(store.create_session().unwrap(), "session_1");
        assert_eq!(store.create_session().unwrap(), "session_2");
    }

    #[test]
    fn test_history_format_and_limit() {
        let store = SessionStore::new(2);
        let id = store.create_session().unwrap();
        assert_eq!(store.get_history(&id).unwrap(), None);

        store.add_exchange(&id, "q1", "a1").unwrap();
        assert_eq!(
            store.get_history(&id).unwrap().as_deref(),
            Some("User: q1\nAssistant: a1")
        );

        store.add_exchange(&id, "q2", "a2").unwrap();
        store.add_exchange(&id, "q3", "a3").unwrap();
        assert_eq!(
            store.get_history(&id).unwrap().as_deref(),
            Some("User: q2\nAssistant: a2\nUser: q3\nAssistant: a3")
        );
    }

    #[test]
    fn test_oldest_session_evicted_past_limit() {
        let store = SessionStore::new(2).with_max_sessions(2);
        let first = store.create_session().unwrap();
        store.add_exchange(&first, "q1", "a1").unwrap();
        let second = store.create_session().unwrap();
        store.add_exchange(&second, "q2", "a2").unwrap();

        // Existing sessions do not count as new.
        store.add_exchange(&first, "q3", "a3").unwrap();
        assert!(store.get_history(&first).unwrap().is_some());

        let third = store.create_session().unwrap();
        store.add_exchange(&third, "q4", "a4").unwrap();

        assert_eq!(store.get_history(&first).unwrap(), None);
        assert!(store.get_history(&second).unwrap().is_some());
        assert!(store.get_history(&third).unwrap().is_some());
        assert_eq!(third, "session_3");
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new(2);
        assert_eq!(store.get_history("session_99").unwrap(), None);

        store.add_exchange("session_99", "q", "a").unwrap();
        assert!(store.get_history("session_99").unwrap().is_some());

        store.clear_session("session_99").unwrap();
        assert_eq!(store.get_history("session_99").unwrap(), None);
    }
}
