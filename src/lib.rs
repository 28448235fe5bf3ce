//! Barista Chat
//!
//! A coffee-recipe chat widget served by Axum. The server owns every piece
//! of widget state; the browser is a thin HTMX client that posts events
//! and swaps in the returned HTML.
//!
//! # Architecture
//!
//! - **Server**: Axum router with one session per page load
//! - **Proxy client**: one non-streaming Responses-format request per turn
//! - **Conversation controller**: validates, renders, calls, settles
//! - **Chrome controller**: chat/settings view and persisted theme
//!
//! # Modules
//!
//! - [`chat`]: conversation controller
//! - [`config`]: layered configuration
//! - [`error`]: error taxonomy
//! - [`llm`]: proxy client
//! - [`server`]: HTTP surface
//! - [`session`]: conversation and session management
//! - [`ui`]: widget state and rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod server;
pub mod session;
pub mod ui;

use std::sync::Arc;

use crate::chat::ConversationController;
use crate::config::AppConfig;
use crate::llm::{CompletionClient, ResponsesClient};
use crate::session::{Conversation, ConversationState, Session, SessionStore};
use crate::ui::chrome::ChromeController;
use crate::ui::preferences::{ClientPreferences, FilePreferenceStore, PreferenceStore};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Global configuration.
    pub config: Arc<AppConfig>,
    /// Session store, one entry per open widget.
    pub sessions: SessionStore,
    /// Conversation controller shared by every session.
    pub controller: Arc<ConversationController>,
    /// Durable storage for the theme preference, keyed per browser client.
    pub preferences: Arc<dyn PreferenceStore>,
}

impl AppState {
    /// Build the production state: HTTP proxy client and file-backed preferences.
    pub fn from_config(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let client = ResponsesClient::new(config.proxy.timeout())?;
        let preferences = FilePreferenceStore::open(&config.widget.preferences_path)?;
        Ok(Self::with_parts(config, Arc::new(client), Arc::new(preferences)))
    }

    /// Build a state from explicit collaborators.
    #[must_use]
    pub fn with_parts(
        config: Arc<AppConfig>,
        client: Arc<dyn CompletionClient>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        let controller = ConversationController::new(
            client,
            config.widget.overlap_policy,
            config.widget.reset_continuation_on_clear,
        );
        Self {
            sessions: SessionStore::new(config.widget.session_timeout()),
            controller: Arc::new(controller),
            preferences,
            config,
        }
    }

    /// Open a new widget: seeded log, fresh continuation, and the theme
    /// `client_id` last stored.
    pub fn open_session(&self, client_id: &str) -> Session {
        let state = ConversationState::from_config(&self.config.proxy);
        let conversation = Conversation::new(state, self.config.persona.clone());
        let preferences = ClientPreferences::new(Arc::clone(&self.preferences), client_id);
        let chrome = ChromeController::load(Arc::new(preferences));
        let session = self.sessions.create(conversation, chrome);
        tracing::info!(
            name: "session.opened",
            session_id = %session.id(),
            client_id = %client_id,
            active_sessions = self.sessions.len(),
            "Widget session opened"
        );
        session
    }
}
