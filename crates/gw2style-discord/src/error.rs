//! Error types for the Discord integration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscordError {
    /// The HTTP response had an unexpected status code.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// An error from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An error from the WebSocket layer.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The gateway closed the socket.
    #[error("Gateway closed with code {code}: {reason}")]
    GatewayClosed { code: u16, reason: String },

    /// The gateway closed for good.
    #[error("Gateway is not connected")]
    NotConnected,

    #[error("{0}")]
    Other(String),
}

impl DiscordError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscordError>;
