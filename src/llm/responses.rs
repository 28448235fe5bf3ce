//! Responses-format proxy client.
//!
//! One POST per turn; the reply is read from `output[0].content[0].text`
//! and the continuation from the top-level `id`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ProxyError;
use crate::session::ConversationState;

use super::{Completion, CompletionClient};

/// Outgoing request body.
#[derive(Debug, Serialize)]
pub struct ResponsesRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// The user's text, verbatim.
    pub input: &'a str,
    /// Persona instruction.
    pub instructions: &'a str,
    /// Continuation of a prior response, omitted on the first turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<&'a str>,
}

impl<'a> ResponsesRequest<'a> {
    /// Build the payload for `text` under `state`.
    #[must_use]
    pub fn new(text: &'a str, state: &'a ConversationState) -> Self {
        Self {
            model: &state.model,
            input: text,
            instructions: &state.system_instruction,
            previous_response_id: state.continuation(),
        }
    }
}

/// Successful response body. Only the consumed fields are modelled.
#[derive(Debug, Deserialize)]
pub struct ResponsesBody {
    /// Response id, used as the continuation id.
    pub id: Option<String>,
    /// Output items.
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// One output item.
#[derive(Debug, Deserialize)]
pub struct OutputItem {
    /// Content blocks of the item.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One content block.
#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    /// Text of the block.
    pub text: Option<String>,
}

impl ResponsesBody {
    /// Parse a raw body.
    pub fn parse(raw: &str) -> Result<Self, ProxyError> {
        serde_json::from_str(raw).map_err(|e| ProxyError::Protocol(format!("invalid JSON body: {e}")))
    }

    /// Extract the reply and continuation id, validating the shape.
    pub fn into_completion(self) -> Result<Completion, ProxyError> {
        let continuation_id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProxyError::Protocol("missing response id".to_string()))?;

        let reply_html = self
            .output
            .into_iter()
            .next()
            .ok_or_else(|| ProxyError::Protocol("empty output".to_string()))?
            .content
            .into_iter()
            .next()
            .ok_or_else(|| ProxyError::Protocol("first output item has no content".to_string()))?
            .text
            .ok_or_else(|| ProxyError::Protocol("first content block has no text".to_string()))?;

        Ok(Completion {
            reply_html,
            continuation_id,
        })
    }
}

/// Client for a Responses-format proxy endpoint.
#[derive(Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
}

impl std::fmt::Debug for ResponsesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsesClient").finish_non_exhaustive()
    }
}

impl ResponsesClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl CompletionClient for ResponsesClient {
    async fn request_completion(
        &self,
        text: &str,
        state: &ConversationState,
    ) -> Result<Completion, ProxyError> {
        let body = ResponsesRequest::new(text, state);

        tracing::debug!(
            name: "proxy.request.sent",
            endpoint = %state.endpoint,
            model = %state.model,
            continued = body.previous_response_id.is_some(),
            input_length = text.len(),
            "Sending completion request"
        );

        let resp = self
            .http
            .post(&state.endpoint)
            .bearer_auth(&state.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProxyError::Network {
                status: status.as_u16(),
            });
        }

        let raw = resp.text().await?;
        tracing::debug!(
            name: "proxy.response.received",
            status = status.as_u16(),
            body_length = raw.len(),
            "Completion response received"
        );
        tracing::trace!(body = %raw, "Full completion response");

        ResponsesBody::parse(&raw)?.into_completion()
    }
}
