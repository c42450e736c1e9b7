//! Per-session conversation history.
//!
//! Sessions are created lazily on first contact with exactly one system
//! persona turn, then only ever appended to. Creation goes through the
//! map's entry API so N concurrent first contacts still insert a single
//! system turn. Each session's turn list sits behind its own mutex, which is
//! never held across an `.await`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Session id used when the caller does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Label used when a conversation is flattened into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    turns: Vec<Turn>,
    last_access: Instant,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    state: Mutex<SessionState>,
}

/// Shared handle to one session. Cloning is cheap; all clones see the same
/// turn list.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    fn new(id: &str, system_instruction: &str) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: id.to_string(),
                state: Mutex::new(SessionState {
                    turns: vec![Turn::new(Role::System, system_instruction)],
                    last_access: Instant::now(),
                }),
            }),
        }
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Append one turn.
    pub fn append(&self, role: Role, content: impl Into<String>) {
        let mut state = self.inner.state.lock();
        state.turns.push(Turn::new(role, content));
        state.last_access = Instant::now();
    }

    /// Append a user turn and its assistant reply as one unit, so
    /// concurrent turns on the same session never interleave their pairs.
    pub fn append_exchange(&self, user: impl Into<String>, assistant: impl Into<String>) {
        let mut state = self.inner.state.lock();
        state.turns.push(Turn::new(Role::User, user));
        state.turns.push(Turn::new(Role::Assistant, assistant));
        state.last_access = Instant::now();
    }

    /// Snapshot of the turns so far.
    pub fn turns(&self) -> Vec<Turn> {
        self.inner.state.lock().turns.clone()
    }

    /// Number of turns, including the system turn.
    pub fn len(&self) -> usize {
        self.inner.state.lock().turns.len()
    }

    /// Always false: a session starts with its system turn.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff no user turn has been recorded yet.
    pub fn is_first_user_message(&self) -> bool {
        !self
            .inner
            .state
            .lock()
            .turns
            .iter()
            .any(|t| t.role == Role::User)
    }

    fn touch(&self) {
        self.inner.state.lock().last_access = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.inner.state.lock().last_access.elapsed()
    }

    /// True while a clone exists outside the store, e.g. an in-flight turn.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.inner) > 1
    }
}

/// Process-wide session store.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    system_instruction: String,
}

impl SessionStore {
    /// Create a store whose sessions all start with `system_instruction`.
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            sessions: DashMap::new(),
            system_instruction: system_instruction.into(),
        }
    }

    /// Return the session for `id`, creating it with its system turn on
    /// first contact. Idempotent.
    pub fn get_or_create(&self, id: &str) -> SessionHandle {
        let handle = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                log::debug!("Creating session {}", id);
                SessionHandle::new(id, &self.system_instruction)
            })
            .clone();
        handle.touch();
        handle
    }

    /// Existing session for `id`, without creating one.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|h| h.clone())
    }

    /// True iff the session is unknown or has no user turns yet.
    pub fn is_first_user_message(&self, id: &str) -> bool {
        self.get(id)
            .map(|h| h.is_first_user_message())
            .unwrap_or(true)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session exists.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for at least `ttl`. Returns how many were removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, handle| handle.in_use() || handle.idle_for() < ttl);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            log::info!("Evicted {} idle session(s)", removed);
        }
        removed
    }

    /// Periodically evict idle sessions until the runtime shuts down.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        ttl: Duration,
        every: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.evict_idle(ttl);
            }
        })
    }
}
