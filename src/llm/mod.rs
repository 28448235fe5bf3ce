//! Proxy client for the remote completion endpoint.
//!
//! The [`CompletionClient`] trait is the seam between the conversation
//! controller and the network. [`ResponsesClient`] speaks the `OpenAI`
//! Responses wire format (non-streaming) against a proxy that holds the
//! real provider credentials.
//!
//! # Example
//!
//! ```rust,ignore
//! use barista_chat::llm::{CompletionClient, ResponsesClient};
//! use barista_chat::session::ConversationState;
//!
//! let client = ResponsesClient::new(std::time::Duration::from_secs(60))?;
//! let state = ConversationState::new("https://proxy.example/api", "gpt-4o-mini", "...", "key");
//! let completion = client.request_completion("A mocha recipe?", &state).await?;
//! ```

pub mod responses;

pub use responses::ResponsesClient;

use crate::error::ProxyError;
use crate::session::ConversationState;

/// Result of one successful completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Markup returned by the model.
    pub reply_html: String,
    /// Id to send as the continuation of the next request.
    pub continuation_id: String,
}

/// Issues one completion request per user turn.
///
/// Implementations must not mutate shared state; the caller stores the
/// returned continuation id.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync + std::fmt::Debug {
    /// Send `text` in the context of `state` and return the reply.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Network`] on a non-2xx status, [`ProxyError::Protocol`]
    /// when the body does not have the expected shape, and
    /// [`ProxyError::Transport`] when no response arrives.
    async fn request_completion(
        &self,
        text: &str,
        state: &ConversationState,
    ) -> Result<Completion, ProxyError>;
}
