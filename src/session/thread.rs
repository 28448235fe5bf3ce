//! Widget sessions and session storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::PersonaConfig;
use crate::ui::chrome::ChromeController;
use crate::ui::composer::Composer;
use crate::ui::renderer::MessageRenderer;
use crate::ui::transcript::{MessageLog, Transcript};

use super::ConversationState;

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Conversation half of a widget: state, log, input, and in-flight count.
#[derive(Debug)]
pub struct Conversation {
    /// Continuation id and fixed request configuration.
    pub state: ConversationState,
    /// Writer of the chat log.
    pub renderer: MessageRenderer<Transcript>,
    /// Message input field.
    pub composer: Composer,
    outstanding: usize,
}

impl Conversation {
    /// Start a conversation whose log holds only the startup greeting.
    #[must_use]
    pub fn new(state: ConversationState, persona: PersonaConfig) -> Self {
        let mut renderer = MessageRenderer::new(Transcript::new(), persona);
        renderer.seed();
        Self {
            state,
            renderer,
            composer: Composer::default(),
            outstanding: 0,
        }
    }

    /// The chat log.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        self.renderer.log()
    }

    /// Whether any request is still outstanding.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.outstanding > 0
    }

    /// Whether a request is outstanding but its placeholder was cleared away.
    ///
    /// The page then has nothing polling for the reply.
    #[must_use]
    pub fn awaiting_unseen_reply(&self) -> bool {
        self.in_flight() && !self.transcript().turns().iter().any(|t| t.loading)
    }

    pub(crate) fn request_started(&mut self) {
        self.outstanding += 1;
    }

    pub(crate) fn request_settled(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}

/// One widget instance, created per page load.
///
/// Cloning is cheap and yields a handle to the same session.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    conversation: Mutex<Conversation>,
    chrome: Mutex<ChromeController>,
    /// Bumped whenever a turn settles.
    settled: watch::Sender<u64>,
    created_at: DateTime<Utc>,
    last_activity: RwLock<DateTime<Utc>>,
}

impl Session {
    fn new(id: String, conversation: Conversation, chrome: ChromeController) -> Self {
        let now = Utc::now();
        let (settled, _) = watch::channel(0);
        Self {
            inner: Arc::new(SessionInner {
                id,
                conversation: Mutex::new(conversation),
                chrome: Mutex::new(chrome),
                settled,
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Run `f` with exclusive access to the conversation.
    ///
    /// The lock is released when `f` returns; never await inside `f`.
    pub fn with_conversation<R>(&self, f: impl FnOnce(&mut Conversation) -> R) -> R {
        let mut guard = self
            .inner
            .conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut guard);
        drop(guard);
        self.touch();
        out
    }

    /// Run `f` with exclusive access to the chrome controller.
    pub fn with_chrome<R>(&self, f: impl FnOnce(&mut ChromeController) -> R) -> R {
        let mut guard = self
            .inner
            .chrome
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut guard);
        drop(guard);
        self.touch();
        out
    }

    /// Wake everyone waiting in [`Session::wait_until_gone`].
    pub fn notify_settled(&self) {
        self.inner.settled.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Wait until the turn `turn_id` is no longer in the log.
    pub async fn wait_until_gone(&self, turn_id: Uuid) {
        let mut rx = self.inner.settled.subscribe();
        loop {
            let present = self.with_conversation(|c| c.transcript().contains(turn_id));
            if !present {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait until no request is outstanding.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.settled.subscribe();
        loop {
            if !self.with_conversation(|c| c.in_flight()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Ok(idle) = (Utc::now() - last).to_std() {
            idle > timeout
        } else {
            // Negative duration means clock skew or "last" is in future.
            false
        }
    }

    /// Get the session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        (Utc::now() - self.inner.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    /// Create a store whose sessions expire after `timeout` of inactivity.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                timeout,
            }),
        }
    }

    /// Register a new session. Expired sessions are dropped first.
    pub fn create(&self, conversation: Conversation, chrome: ChromeController) -> Session {
        let removed = self.cleanup_expired();
        if removed > 0 {
            tracing::debug!(name: "session.expired", removed, "Removed idle sessions");
        }

        let session = Session::new(Uuid::new_v4().to_string(), conversation, chrome);
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(session.id().to_string(), session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let guard = self
            .inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(id).cloned()
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than the store timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let timeout = self.inner.timeout;
        let mut guard = self
            .inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    /// List all session IDs.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
