// src/infra/errors.rs — Error types for chatgate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    // Backend errors
    #[error("Provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited by '{provider}'")]
    RateLimited { provider: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Malformed response from '{provider}': {message}")]
    MalformedResponse { provider: String, message: String },

    // Transport
    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Audio conversion failed: {0}")]
    Audio(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// The reply shown to the user when handling their event failed.
    pub fn user_notice(&self) -> &'static str {
        match self {
            GatewayError::Timeout { .. } => "Image generation timed out. Please try again.",
            GatewayError::MalformedResponse { .. } => {
                "The assistant returned an empty answer. Please try again."
            }
            _ => {
                "Something went wrong while processing your message. \
                 Please try again or send /new to start over."
            }
        }
    }

    /// Whether this failure came from a backend (transcription, chat, image).
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            GatewayError::Provider { .. }
                | GatewayError::RateLimited { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::MalformedResponse { .. }
        )
    }
}
