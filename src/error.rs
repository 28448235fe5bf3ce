//! Error types shared across the widget.

use thiserror::Error;

/// Failure of a single completion request against the proxy endpoint.
///
/// Every variant is recoverable: the conversation controller converts it
/// into the fallback turn and the conversation stays usable.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The proxy answered with a non-2xx status.
    #[error("proxy returned HTTP {status}")]
    Network {
        /// HTTP status code returned by the proxy.
        status: u16,
    },

    /// The request never produced a response (connection refused, timeout, ...).
    #[error("proxy transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The 2xx body did not match the expected response shape.
    #[error("malformed proxy response: {0}")]
    Protocol(String),
}

impl ProxyError {
    /// HTTP status carried by the error, if the proxy answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Protocol(_) => None,
        }
    }
}

/// Input rejected before any work is done. Never surfaced to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("message is empty")]
pub struct ValidationError;

/// Durable preference storage failure.
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// Reading or writing the backing file failed.
    #[error("preference storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not hold a JSON string map.
    #[error("preference storage is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}
