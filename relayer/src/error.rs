//! Error types for the BetVex Relayer

use thiserror::Error;

/// A receipt in an execution outcome that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFailure {
    /// Identifier of the first failing receipt
    pub receipt_id: String,
    /// Raw status as reported by the node
    pub status: String,
}

impl std::fmt::Display for ReceiptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "receipt {} failed with status {}", self.receipt_id, self.status)
    }
}

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Access key {public_key} not found for account {account_id}")]
    NotFound {
        account_id: String,
        public_key: String,
    },

    #[error("RPC error calling {method}: {message}")]
    Rpc { method: String, message: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Proxy call execution failed: {0}")]
    ProxyExecution(ReceiptFailure),

    /// The proxy call may already be committed on-chain when this is returned.
    #[error("Broadcast execution failed: {0}")]
    BroadcastExecution(ReceiptFailure),

    #[error("Malformed signed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayerError {
    pub fn rpc(method: &str, message: impl Into<String>) -> Self {
        RelayerError::Rpc {
            method: method.to_string(),
            message: message.into(),
        }
    }

    /// Check if the caller may retry the whole request
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayerError::Rpc { .. } | RelayerError::Timeout { .. })
    }

    /// Check if error should trigger an alert
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            RelayerError::Config(_)
                | RelayerError::MalformedPayload(_)
                | RelayerError::BroadcastExecution(_)
        )
    }

    /// Failing receipt, for the execution error variants
    pub fn failing_receipt(&self) -> Option<&ReceiptFailure> {
        match self {
            RelayerError::ProxyExecution(f) | RelayerError::BroadcastExecution(f) => Some(f),
            _ => None,
        }
    }

    /// Short stable name used for metrics labels and API responses
    pub fn kind(&self) -> &'static str {
        match self {
            RelayerError::Config(_) => "config",
            RelayerError::NotFound { .. } => "not_found",
            RelayerError::Rpc { .. } => "rpc",
            RelayerError::Timeout { .. } => "timeout",
            RelayerError::ProxyExecution(_) => "proxy_execution",
            RelayerError::BroadcastExecution(_) => "broadcast_execution",
            RelayerError::MalformedPayload(_) => "malformed_payload",
            RelayerError::InvalidRequest(_) => "invalid_request",
            RelayerError::Internal(_) => "internal",
        }
    }
}

/// Result type for relayer operations
pub type RelayerResult<T> = Result<T, RelayerError>;
