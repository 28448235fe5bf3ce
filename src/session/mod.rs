//! Session and conversation state management.
//!
//! Every page load opens one [`Session`]: a widget instance holding its own
//! chat log, continuation id, and view/theme state. Sessions live in memory
//! only; a reload starts a fresh conversation.
//!
//! # Architecture
//!
//! - [`ConversationState`]: continuation id plus fixed request configuration
//! - [`Conversation`]: state, chat log, and input field of one widget
//! - [`Session`]: one widget instance
//! - [`SessionStore`]: thread-safe store for all active sessions

mod state;
mod thread;

pub use state::ConversationState;
pub use thread::{Conversation, DEFAULT_SESSION_TIMEOUT, Session, SessionStore};
