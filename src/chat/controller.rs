//! Conversation controller: runs one user turn end to end.
//!
//! A turn is split in two halves so the HTTP layer can answer the browser
//! as soon as the user turn and placeholder are rendered:
//!
//! 1. [`ConversationController::begin_turn`] validates the input, renders the
//!    user turn, clears the input field, and renders the placeholder.
//! 2. [`ConversationController::finish_turn`] calls the proxy and replaces
//!    the placeholder with the reply or the fallback turn.
//!
//! The session lock is never held across the network call.

use std::sync::Arc;

use crate::config::OverlapPolicy;
use crate::error::ProxyError;
use crate::llm::CompletionClient;
use crate::session::{ConversationState, Session};
use crate::ui::composer::validate_input;
use crate::ui::renderer::PlaceholderHandle;

/// How a submitted turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Input was empty after trimming; nothing was rendered or sent.
    Ignored,
    /// A reply is still outstanding and the overlap policy rejects the send.
    Busy,
    /// The reply was rendered and the continuation id advanced.
    Replied {
        /// Id stored for the next request.
        continuation_id: String,
    },
    /// The fallback turn was rendered.
    Failed(ProxyError),
}

/// A turn whose user message and placeholder are already in the log.
#[derive(Debug)]
pub struct PendingTurn {
    session: Session,
    text: String,
    state: ConversationState,
    placeholder: PlaceholderHandle,
}

impl PendingTurn {
    /// Placeholder rendered for this turn.
    #[must_use]
    pub fn placeholder(&self) -> PlaceholderHandle {
        self.placeholder
    }

    /// Session the turn belongs to.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// Orchestrates user turns against a [`CompletionClient`].
#[derive(Debug, Clone)]
pub struct ConversationController {
    client: Arc<dyn CompletionClient>,
    policy: OverlapPolicy,
    reset_on_clear: bool,
}

impl ConversationController {
    /// Create a controller.
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>, policy: OverlapPolicy, reset_on_clear: bool) -> Self {
        Self {
            client,
            policy,
            reset_on_clear,
        }
    }

    /// Active overlap policy.
    #[must_use]
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Whether the send control should be disabled for `session`.
    #[must_use]
    pub fn send_blocked(&self, session: &Session) -> bool {
        self.policy == OverlapPolicy::Serialize && session.with_conversation(|c| c.in_flight())
    }

    /// Render the user turn and placeholder for `raw`.
    ///
    /// Returns the terminal outcome instead when the turn never starts.
    pub fn begin_turn(&self, session: &Session, raw: &str) -> Result<PendingTurn, TurnOutcome> {
        let Ok(text) = validate_input(raw) else {
            return Err(TurnOutcome::Ignored);
        };

        let started = session.with_conversation(|c| {
            if self.policy == OverlapPolicy::Serialize && c.in_flight() {
                return None;
            }
            c.renderer.render_user(text);
            c.composer.clear();
            let placeholder = c.renderer.render_loading_placeholder();
            c.request_started();
            Some((placeholder, c.state.clone()))
        });

        let Some((placeholder, state)) = started else {
            tracing::debug!(
                name: "chat.turn.busy",
                session_id = %session.id(),
                "Send rejected while a reply is outstanding"
            );
            return Err(TurnOutcome::Busy);
        };

        tracing::info!(
            name: "chat.turn.started",
            session_id = %session.id(),
            turn_id = %placeholder.id(),
            input_length = text.len(),
            "Turn started"
        );

        Ok(PendingTurn {
            session: session.clone(),
            text: text.to_string(),
            state,
            placeholder,
        })
    }

    /// Call the proxy and settle the placeholder of `turn`.
    ///
    /// Never fails: proxy errors become the fallback turn.
    pub async fn finish_turn(&self, turn: PendingTurn) -> TurnOutcome {
        let PendingTurn {
            session,
            text,
            state,
            placeholder,
        } = turn;

        let result = self.client.request_completion(&text, &state).await;

        let outcome = session.with_conversation(|c| {
            c.request_settled();
            c.renderer.remove_placeholder(placeholder);
            match result {
                Ok(completion) => {
                    c.state.advance(completion.continuation_id.clone());
                    c.renderer.render_reply(&completion.reply_html);
                    TurnOutcome::Replied {
                        continuation_id: completion.continuation_id,
                    }
                }
                Err(err) => {
                    c.renderer.render_fallback();
                    TurnOutcome::Failed(err)
                }
            }
        });
        session.notify_settled();

        match &outcome {
            TurnOutcome::Replied { continuation_id } => tracing::info!(
                name: "chat.turn.replied",
                session_id = %session.id(),
                continuation_id = %continuation_id,
                "Turn completed"
            ),
            TurnOutcome::Failed(err) => tracing::warn!(
                name: "chat.turn.failed",
                session_id = %session.id(),
                status = ?err.status(),
                error = %err,
                "Turn failed, fallback rendered"
            ),
            TurnOutcome::Ignored | TurnOutcome::Busy => {}
        }

        outcome
    }

    /// Run a whole turn: begin, call the proxy, settle.
    pub async fn submit_turn(&self, session: &Session, raw: &str) -> TurnOutcome {
        match self.begin_turn(session, raw) {
            Ok(pending) => self.finish_turn(pending).await,
            Err(outcome) => outcome,
        }
    }

    /// Empty the log and reseed it with the cleared-chat greeting.
    ///
    /// The continuation id survives unless configured otherwise.
    pub fn clear_conversation(&self, session: &Session) {
        session.with_conversation(|c| {
            c.renderer.clear();
            if self.reset_on_clear {
                c.state.reset_continuation();
            }
        });
        session.notify_settled();
        tracing::info!(
            name: "chat.cleared",
            session_id = %session.id(),
            continuation_reset = self.reset_on_clear,
            "Conversation cleared"
        );
    }
}
