//! Cross-request conversation state.

use crate::config::ProxyConfig;

/// Everything the proxy client needs to issue one request.
///
/// Built once per session from [`ProxyConfig`]. Only `continuation_id`
/// changes afterwards, and only after a successful response.
#[derive(Clone, PartialEq, Eq)]
pub struct ConversationState {
    /// Opaque id returned by the proxy; empty until the first success.
    pub continuation_id: String,
    /// Bearer credential sent with every request.
    pub api_key: String,
    /// Persona instruction sent with every request.
    pub system_instruction: String,
    /// Proxy endpoint URL.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
}

impl ConversationState {
    /// Create a fresh state with no continuation.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            continuation_id: String::new(),
            api_key: api_key.into(),
            system_instruction: system_instruction.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Create a fresh state from the proxy section of the app config.
    #[must_use]
    pub fn from_config(proxy: &ProxyConfig) -> Self {
        Self::new(
            proxy.endpoint.clone(),
            proxy.model.clone(),
            proxy.instructions.clone(),
            proxy.api_key.clone(),
        )
    }

    /// Continuation id to thread into the next request, if any.
    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        (!self.continuation_id.is_empty()).then_some(self.continuation_id.as_str())
    }

    /// Record the id returned by a successful response.
    pub fn advance(&mut self, continuation_id: impl Into<String>) {
        self.continuation_id = continuation_id.into();
    }

    /// Forget the server-side context.
    pub fn reset_continuation(&mut self) {
        self.continuation_id.clear();
    }
}

impl std::fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationState")
            .field("continuation_id", &self.continuation_id)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
