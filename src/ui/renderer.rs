//! Message renderer: the only writer of the chat log.

use uuid::Uuid;

use crate::config::PersonaConfig;

use super::transcript::{MessageLog, Turn};

/// Handle to a loading placeholder, used to remove exactly that entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderHandle(Uuid);

impl PlaceholderHandle {
    /// Id of the placeholder turn in the log.
    #[must_use]
    pub fn id(self) -> Uuid {
        self.0
    }
}

/// Appends turns to a [`MessageLog`] and keeps the view scrolled to the end.
///
/// User text is stored as-is and is never treated as markup when the log
/// is turned into HTML. Assistant markup is inserted verbatim; the proxy is
/// trusted to return safe HTML and nothing here sanitizes it.
#[derive(Debug, Clone)]
pub struct MessageRenderer<L> {
    log: L,
    persona: PersonaConfig,
}

impl<L: MessageLog> MessageRenderer<L> {
    /// Wrap a log container.
    pub fn new(log: L, persona: PersonaConfig) -> Self {
        Self { log, persona }
    }

    /// Read access to the underlying log.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Copy used for greetings, placeholders and fallbacks.
    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    fn push(&mut self, turn: Turn) -> Uuid {
        let id = turn.id;
        self.log.append(turn);
        self.log.scroll_to_end();
        id
    }

    /// Append the startup greeting.
    pub fn seed(&mut self) {
        let html = self.persona.prefixed(&self.persona.greeting);
        self.push(Turn::assistant(html));
    }

    /// Append a user turn. The text is plain text.
    pub fn render_user(&mut self, text: &str) {
        self.push(Turn::user(text));
    }

    /// Append an assistant turn. The argument is markup.
    pub fn render_assistant(&mut self, html: &str) {
        self.push(Turn::assistant(html));
    }

    /// Append the bot-prefixed reply for a successful completion.
    pub fn render_reply(&mut self, reply_html: &str) {
        let html = self.persona.prefixed(reply_html);
        self.render_assistant(&html);
    }

    /// Append the fixed message shown when a turn fails.
    pub fn render_fallback(&mut self) {
        let html = self.persona.fallback_turn();
        self.render_assistant(&html);
    }

    /// Append the loading placeholder and return a handle to it.
    pub fn render_loading_placeholder(&mut self) -> PlaceholderHandle {
        let html = self.persona.prefixed(&self.persona.loading_text);
        PlaceholderHandle(self.push(Turn::placeholder(html)))
    }

    /// Remove a placeholder. Returns `false` if it was already gone (e.g. cleared).
    pub fn remove_placeholder(&mut self, handle: PlaceholderHandle) -> bool {
        self.log.remove(handle.0).is_some()
    }

    /// Empty the log and reseed it with the cleared-chat greeting.
    pub fn clear(&mut self) {
        self.log.clear();
        let html = self.persona.prefixed(&self.persona.cleared_greeting);
        self.push(Turn::assistant(html));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::transcript::{Transcript, TurnRole};

    fn renderer() -> MessageRenderer<Transcript> {
        let mut r = MessageRenderer::new(Transcript::new(), PersonaConfig::default());
        r.seed();
        r
    }

    #[test]
    fn seed_appends_greeting() {
        let r = renderer();
        let turns = r.log().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, TurnRole::Assistant);
        assert!(turns[0].content.starts_with(&PersonaConfig::default().bot_prefix));
    }

    #[test]
    fn placeholder_is_removed_by_handle() {
        let mut r = renderer();
        r.render_user("a latte please");
        let first = r.render_loading_placeholder();
        let second = r.render_loading_placeholder();

        assert!(r.remove_placeholder(first));
        assert!(!r.remove_placeholder(first));

        let turns = r.log().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].id, second.id());
        assert!(turns[2].loading);
    }

    #[test]
    fn every_render_scrolls_to_newest() {
        let mut r = renderer();
        r.render_user("hi");
        let last = r.log().turns().last().map(|t| t.id);
        assert_eq!(r.log().scroll_anchor(), last);

        let handle = r.render_loading_placeholder();
        assert_eq!(r.log().scroll_anchor(), Some(handle.id()));
    }

    #[test]
    fn clear_leaves_single_greeting() {
        let mut r = renderer();
        for i in 0..5 {
            r.render_user(&format!("message {i}"));
            r.render_reply("<p>ok</p>");
        }
        r.clear();

        let persona = PersonaConfig::default();
        let turns = r.log().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, persona.prefixed(&persona.cleared_greeting));
    }

    #[test]
    fn reply_is_prefixed_and_verbatim() {
        let mut r = renderer();
        r.render_reply("<strong>Hi</strong>");
        let persona = PersonaConfig::default();
        let last = r.log().turns().last().map(|t| t.content.clone());
        assert_eq!(last, Some(format!("{}<strong>Hi</strong>", persona.bot_prefix)));
    }
}
