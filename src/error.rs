//! Error types for the payment gateway
//!
//! One crate-wide error enum covers the whole taxonomy: per-request decode
//! and validation failures, facilitator outcomes, and startup configuration
//! errors. Each variant maps to an HTTP status and a machine-readable code
//! so the middleware can build responses without matching on strings.

use http::StatusCode;
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors produced by the payment gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The payment header could not be decoded into a payload
    #[error("malformed payment header: {0}")]
    Decode(String),

    /// The payload names a network family the router has no capability for
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// The requested token is not in the requirement's accepted set
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),

    /// The facilitator returned a well-formed response with success=false.
    /// Not retryable with the same proof; the client must re-fetch
    /// requirements and produce a fresh one.
    #[error("payment rejected by facilitator: {reason}")]
    PaymentInvalid {
        /// Reason reported by the facilitator
        reason: String,
    },

    /// Transport or service failure while talking to the facilitator.
    /// Retryable with the same proof, since settlement has not succeeded.
    #[error("facilitator unavailable: {0}")]
    FacilitatorUnavailable(String),

    /// A route is missing its payee address or facilitator URL.
    /// Detected at startup; never surfaced on a request path.
    #[error("misconfigured route: {0}")]
    MisconfiguredRoute(String),

    /// General configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl GatewayError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an unsupported-network error
    pub fn unsupported_network(network: impl Into<String>) -> Self {
        Self::UnsupportedNetwork(network.into())
    }

    /// Create an unsupported-token error
    pub fn unsupported_token(token: impl Into<String>) -> Self {
        Self::UnsupportedToken(token.into())
    }

    /// Create a payment-invalid error with the facilitator's reason
    pub fn payment_invalid(reason: impl Into<String>) -> Self {
        Self::PaymentInvalid {
            reason: reason.into(),
        }
    }

    /// Create a facilitator-unavailable error
    pub fn facilitator_unavailable(msg: impl Into<String>) -> Self {
        Self::FacilitatorUnavailable(msg.into())
    }

    /// Create a misconfigured-route error
    pub fn misconfigured_route(msg: impl Into<String>) -> Self {
        Self::MisconfiguredRoute(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status this error surfaces as on a request path
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::Base64(_) | Self::UnsupportedNetwork(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnsupportedToken(_) => StatusCode::BAD_REQUEST,
            Self::PaymentInvalid { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::FacilitatorUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::MisconfiguredRoute(_) | Self::Config(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for error response bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) | Self::Base64(_) => "decode_error",
            Self::UnsupportedNetwork(_) => "unsupported_network",
            Self::UnsupportedToken(_) => "unsupported_token",
            Self::PaymentInvalid { .. } => "payment_invalid",
            Self::FacilitatorUnavailable(_) => "facilitator_unavailable",
            Self::MisconfiguredRoute(_) => "misconfigured_route",
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Whether a client may retry with the same proof
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FacilitatorUnavailable(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::FacilitatorUnavailable(format!("request timed out: {}", err))
        } else {
            Self::FacilitatorUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::decode("bad header").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::unsupported_network("cosmos:hub").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::payment_invalid("insufficient_funds").status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            GatewayError::facilitator_unavailable("connection refused").status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(GatewayError::decode("x").error_code(), "decode_error");
        assert_eq!(
            GatewayError::unsupported_token("DOGE").error_code(),
            "unsupported_token"
        );
        assert_eq!(
            GatewayError::payment_invalid("expired").error_code(),
            "payment_invalid"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(GatewayError::facilitator_unavailable("503").is_retryable());
        assert!(!GatewayError::payment_invalid("bad nonce").is_retryable());
        assert!(!GatewayError::decode("garbage").is_retryable());
    }
}
