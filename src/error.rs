//! Error taxonomy for the payment flow.
//!
//! `InvalidKeyFormat` is raised at start-up only. Every other kind is a
//! per-request failure that the API layer turns into a
//! `{success: false, message, error}` body.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by credential decryption, session handling and the
/// PhonePe round trips.
///
/// Messages are safe to return to callers: they never carry key material
/// or decrypted plaintext.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// APP_KEY did not decode to a 32-byte key.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Envelope MAC did not match its iv/value.
    #[error("credential integrity check failed")]
    IntegrityCheckFailed,

    /// Envelope could not be decoded or decrypted.
    #[error("credential decryption failed")]
    DecryptionFailed,

    #[error("orderId is required")]
    MissingOrderId,

    /// No payment session cookie on the request (expired or never set).
    #[error("payment session credentials not found")]
    MissingCredentials,

    #[error("payment initiation failed: {message}")]
    PaymentInitiationFailed {
        message: String,
        upstream: Option<Value>,
    },

    #[error("order status query failed: {message}")]
    OrderStatusQueryFailed {
        message: String,
        upstream: Option<Value>,
    },
}

impl PaymentError {
    /// Stable snake_case tag exposed in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::InvalidKeyFormat(_) => "invalid_key_format",
            PaymentError::IntegrityCheckFailed => "integrity_check_failed",
            PaymentError::DecryptionFailed => "decryption_failed",
            PaymentError::MissingOrderId => "missing_order_id",
            PaymentError::MissingCredentials => "missing_credentials",
            PaymentError::PaymentInitiationFailed { .. } => "payment_initiation_failed",
            PaymentError::OrderStatusQueryFailed { .. } => "order_status_query_failed",
        }
    }

    /// Upstream provider payload attached to the failure, if any.
    pub fn upstream(&self) -> Option<&Value> {
        match self {
            PaymentError::PaymentInitiationFailed { upstream, .. }
            | PaymentError::OrderStatusQueryFailed { upstream, .. } => upstream.as_ref(),
            _ => None,
        }
    }

    /// True for errors caused by bad client input (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PaymentError::MissingOrderId)
    }
}
