//! Browser events and their dispatch onto the controllers.
//!
//! The page posts one JSON object per user action, tagged by `event`:
//!
//! ```json
//! {"event": "send_clicked", "message": "A caramel frappe?"}
//! {"event": "key_press", "key": "Enter", "message": "..."}
//! {"event": "theme_toggled", "control": "themeSwitch2", "enabled": true}
//! ```

use serde::{Deserialize, Deserializer};

use crate::chat::{ConversationController, PendingTurn, TurnOutcome};
use crate::session::Session;

/// Key that submits the message from the input field.
pub const SUBMIT_KEY: &str = "Enter";

/// One user action on the widget.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    /// Send button activated.
    SendClicked {
        /// Current value of the input field.
        #[serde(default)]
        message: String,
    },
    /// Key pressed in the input field.
    KeyPress {
        /// Key name as reported by the browser.
        key: String,
        /// Current value of the input field.
        #[serde(default)]
        message: String,
    },
    /// Chat view button activated.
    ChatSelected {
        /// Unsent input field value, kept across the re-render.
        #[serde(default)]
        message: Option<String>,
    },
    /// Settings view button activated.
    SettingsSelected {
        /// Unsent input field value.
        #[serde(default)]
        message: Option<String>,
    },
    /// A theme switch changed.
    ThemeToggled {
        /// Which switch fired; every switch is synced regardless.
        #[serde(default)]
        control: Option<String>,
        /// New switch position.
        #[serde(deserialize_with = "bool_or_string")]
        enabled: bool,
        /// Unsent input field value.
        #[serde(default)]
        message: Option<String>,
    },
    /// Clear-chat button activated.
    ClearClicked {
        /// Unsent input field value.
        #[serde(default)]
        message: Option<String>,
    },
}

/// Accept `true` as well as `"true"`; form encoders stringify checkbox state.
fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s == "true" || s == "on",
    })
}

/// What the dispatch did to the session.
#[derive(Debug)]
pub enum Dispatch {
    /// Widget state changed; re-render.
    Updated,
    /// Nothing changed.
    Ignored,
    /// Send rejected while a reply is outstanding.
    Busy,
    /// A turn was started and must be finished by the caller.
    TurnStarted(PendingTurn),
}

/// Route `event` to the conversation or chrome controller.
pub fn dispatch(controller: &ConversationController, session: &Session, event: UiEvent) -> Dispatch {
    match event {
        UiEvent::SendClicked { message } => submit(controller, session, message),
        UiEvent::KeyPress { key, message } => {
            if key == SUBMIT_KEY {
                submit(controller, session, message)
            } else {
                session.with_conversation(|c| c.composer.set_value(message));
                Dispatch::Ignored
            }
        }
        UiEvent::ChatSelected { message } => {
            keep_draft(session, message);
            session.with_chrome(|chrome| chrome.select_chat());
            Dispatch::Updated
        }
        UiEvent::SettingsSelected { message } => {
            keep_draft(session, message);
            session.with_chrome(|chrome| chrome.select_settings());
            Dispatch::Updated
        }
        UiEvent::ThemeToggled {
            control,
            enabled,
            message,
        } => {
            keep_draft(session, message);
            let result = session.with_chrome(|chrome| chrome.toggle_theme(enabled));
            if let Err(e) = result {
                tracing::warn!(
                    name: "chrome.theme.persist_failed",
                    session_id = %session.id(),
                    control = ?control,
                    error = %e,
                    "Theme applied but not persisted"
                );
            }
            Dispatch::Updated
        }
        UiEvent::ClearClicked { message } => {
            keep_draft(session, message);
            controller.clear_conversation(session);
            Dispatch::Updated
        }
    }
}

/// Store the input value an event carried, if any.
fn keep_draft(session: &Session, message: Option<String>) {
    if let Some(message) = message {
        session.with_conversation(|c| c.composer.set_value(message));
    }
}

fn submit(controller: &ConversationController, session: &Session, message: String) -> Dispatch {
    session.with_conversation(|c| c.composer.set_value(message.clone()));
    match controller.begin_turn(session, &message) {
        Ok(pending) => Dispatch::TurnStarted(pending),
        Err(TurnOutcome::Busy) => Dispatch::Busy,
        Err(_) => Dispatch::Ignored,
    }
}
