//! The chat log container: an ordered list of turns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Author of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Text typed by the person using the widget.
    User,
    /// Reply from the proxy, or a message produced by the widget itself.
    Assistant,
}

/// One message in the chat log.
///
/// User content is plain text; assistant content is markup.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Unique id, also used as the DOM id suffix.
    pub id: Uuid,
    /// Author.
    pub role: TurnRole,
    /// Plain text for users, HTML for the assistant.
    pub content: String,
    /// Whether this turn is the transient "waiting for reply" placeholder.
    pub loading: bool,
    /// When the turn was appended.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(role: TurnRole, content: String, loading: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            loading,
            created_at: Utc::now(),
        }
    }

    /// A plain-text turn typed by the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text.into(), false)
    }

    /// An assistant turn carrying markup.
    #[must_use]
    pub fn assistant(html: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, html.into(), false)
    }

    /// The transient placeholder shown while a request is outstanding.
    #[must_use]
    pub fn placeholder(html: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, html.into(), true)
    }
}

/// Operations the renderer needs from the log container.
pub trait MessageLog {
    /// Append a turn at the end of the log.
    fn append(&mut self, turn: Turn);
    /// Remove a turn by id, returning it if it was present.
    fn remove(&mut self, id: Uuid) -> Option<Turn>;
    /// Drop every turn.
    fn clear(&mut self);
    /// Bring the newest turn into view.
    fn scroll_to_end(&mut self);
    /// Turns in display order.
    fn turns(&self) -> &[Turn];
}

/// In-memory log backing one widget instance.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    scroll_anchor: Option<Uuid>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the turn the view was last scrolled to.
    #[must_use]
    pub fn scroll_anchor(&self) -> Option<Uuid> {
        self.scroll_anchor
    }

    /// Whether a turn with this id is still in the log.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.turns.iter().any(|t| t.id == id)
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log holds no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl MessageLog for Transcript {
    fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    fn remove(&mut self, id: Uuid) -> Option<Turn> {
        let pos = self.turns.iter().position(|t| t.id == id)?;
        let removed = self.turns.remove(pos);
        if self.scroll_anchor == Some(id) {
            self.scroll_anchor = self.turns.last().map(|t| t.id);
        }
        Some(removed)
    }

    fn clear(&mut self) {
        self.turns.clear();
        self.scroll_anchor = None;
    }

    fn scroll_to_end(&mut self) {
        self.scroll_anchor = self.turns.last().map(|t| t.id);
    }

    fn turns(&self) -> &[Turn] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_keeps_order() {
        let mut log = Transcript::new();
        let a = Turn::user("a");
        let b = Turn::placeholder("...");
        let c = Turn::user("c");
        let b_id = b.id;
        log.append(a);
        log.append(b);
        log.append(c);

        assert!(log.remove(b_id).is_some());
        let contents: Vec<_> = log.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["a", "c"]);
        assert!(log.remove(b_id).is_none());
    }

    #[test]
    fn scroll_anchor_follows_last_turn() {
        let mut log = Transcript::new();
        let turn = Turn::assistant("<b>hi</b>");
        let id = turn.id;
        log.append(turn);
        assert_eq!(log.scroll_anchor(), None);

        log.scroll_to_end();
        assert_eq!(log.scroll_anchor(), Some(id));

        log.remove(id);
        assert_eq!(log.scroll_anchor(), None);
    }
}
