//! Error types for the answer engine.

use thiserror::Error;

/// Result type alias using the answer engine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the answer engine.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Gateway Errors (L0)
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Skills Errors (L2)
    // =========================================================================
    #[error("Source adapter not found: {0}")]
    AdapterNotFound(String),

    // =========================================================================
    // Store Errors (L3)
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Governance Errors (L4)
    // =========================================================================
    #[error("Governance error: {0}")]
    Governance(String),

    #[error("Insufficient credits: balance {balance}, required {required}")]
    InsufficientCredits { balance: i64, required: i64 },

    // =========================================================================
    // Model Gateway Errors (L-M)
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("Protocol error: {0}")]
    Protocol(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a governance error.
    pub fn governance(msg: impl Into<String>) -> Self {
        Self::Governance(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a generation error.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable code used in error frames and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::AdapterNotFound(_) => "ADAPTER_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Governance(_) => "GOVERNANCE_ERROR",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::ModelProvider(_) => "MODEL_PROVIDER_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Config(_) | Self::Serialization(_) | Self::Internal(_) | Self::Other(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::invalid_request("empty").code(), "INVALID_REQUEST");
        assert_eq!(Error::generation("boom").code(), "GENERATION_ERROR");
        assert_eq!(Error::AdapterNotFound("video".into()).code(), "ADAPTER_ERROR");
        assert_eq!(
            Error::InsufficientCredits { balance: 0, required: 1 }.code(),
            "INSUFFICIENT_CREDITS"
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(parse).code(), "INTERNAL_ERROR");
    }
}
