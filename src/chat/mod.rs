//! Conversation orchestration.
//!
//! [`ConversationController`] is the only place proxy failures are caught:
//! every error becomes the fallback turn and nothing propagates further.

mod controller;

pub use controller::{ConversationController, PendingTurn, TurnOutcome};
