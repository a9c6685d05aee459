//! Facilitator configuration and response types

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::network::NetworkId;
use super::payment::{PaymentPayload, PaymentRequirement, ProtocolVersion};
use crate::{GatewayError, Result};

/// Default timeout for facilitator calls
///
/// Every settle call carries an explicit timeout so a hung facilitator
/// fails the request instead of hanging it indefinitely.
pub const DEFAULT_FACILITATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Type alias for authentication headers function
pub type AuthHeadersFn = dyn Fn() -> Result<HashMap<String, String>> + Send + Sync;

/// Type alias for authentication headers function wrapped in Arc
pub type AuthHeadersFnArc = Arc<AuthHeadersFn>;

/// Facilitator client configuration
#[derive(Clone)]
pub struct FacilitatorConfig {
    /// Base URL of the facilitator service
    pub url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Function to create authentication headers
    pub create_auth_headers: Option<AuthHeadersFnArc>,
}

impl std::fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("create_auth_headers", &"<function>")
            .finish()
    }
}

impl FacilitatorConfig {
    /// Create a new facilitator config
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_FACILITATOR_TIMEOUT,
            create_auth_headers: None,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the auth headers creator
    pub fn with_auth_headers(mut self, creator: Box<AuthHeadersFn>) -> Self {
        self.create_auth_headers = Some(Arc::from(creator));
        self
    }

    /// Validate the facilitator configuration
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(GatewayError::config("facilitator URL cannot be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(GatewayError::config(
                "facilitator URL must start with http:// or https://",
            ));
        }
        Ok(())
    }
}

/// Request body for `POST /settle`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    /// Protocol version
    #[serde(rename = "x402Version")]
    pub x402_version: ProtocolVersion,
    /// The client payment payload
    #[serde(rename = "paymentPayload")]
    pub payment_payload: PaymentPayload,
    /// The requirement being settled against
    #[serde(rename = "paymentRequirements")]
    pub payment_requirements: PaymentRequirement,
}

/// Canonical settlement result
///
/// All facilitator response shapes normalize into this before reaching
/// the context builder. Obtained synchronously per verification attempt
/// and never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleResponse {
    /// Whether the settlement was successful
    pub success: bool,
    /// Transaction hash or identifier
    pub transaction: String,
    /// Network where the transaction was executed
    pub network: NetworkId,
    /// Payer address if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    /// Error reason if settlement failed
    #[serde(rename = "errorReason", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

impl SettleResponse {
    /// Encode the settle response to base64 for the evidence header
    pub fn to_base64(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }
}

/// Facilitator response shapes across protocol generations
///
/// Legacy facilitators report the transaction id under `txId`; current
/// ones use `transaction`. Both normalize into [`SettleResponse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettleResponseWire {
    /// Current shape, `transaction` field
    Current {
        success: bool,
        transaction: String,
        network: NetworkId,
        #[serde(default)]
        payer: Option<String>,
        #[serde(rename = "errorReason", default)]
        error_reason: Option<String>,
    },
    /// Legacy shape, `txId` field
    Legacy {
        success: bool,
        #[serde(rename = "txId")]
        tx_id: String,
        network: NetworkId,
        #[serde(default)]
        payer: Option<String>,
        #[serde(rename = "errorReason", default)]
        error_reason: Option<String>,
    },
}

impl From<SettleResponseWire> for SettleResponse {
    fn from(wire: SettleResponseWire) -> Self {
        match wire {
            SettleResponseWire::Current {
                success,
                transaction,
                network,
                payer,
                error_reason,
            } => Self {
                success,
                transaction,
                network,
                payer,
                error_reason,
            },
            SettleResponseWire::Legacy {
                success,
                tx_id,
                network,
                payer,
                error_reason,
            } => Self {
                success,
                transaction: tx_id,
                network,
                payer,
                error_reason,
            },
        }
    }
}

/// Supported payment schemes and networks, from `GET /supported`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedKinds {
    /// List of supported scheme/network pairs
    pub kinds: Vec<SupportedKind>,
}

/// Individual supported payment scheme and network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedKind {
    /// Protocol version
    #[serde(rename = "x402Version")]
    pub x402_version: ProtocolVersion,
    /// Payment scheme identifier
    pub scheme: String,
    /// Network identifier
    pub network: NetworkId,
    /// Additional metadata provided by the facilitator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_facilitator_config_validation() {
        assert!(FacilitatorConfig::new("https://facilitator.example.com")
            .validate()
            .is_ok());
        assert!(FacilitatorConfig::new("").validate().is_err());
        assert!(FacilitatorConfig::new("ftp://nope").validate().is_err());
    }

    #[test]
    fn test_settle_response_wire_current() {
        let wire: SettleResponseWire = serde_json::from_value(json!({
            "success": true,
            "transaction": "0xabc123",
            "network": "stacks:testnet",
            "payer": "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
        }))
        .unwrap();
        let normalized: SettleResponse = wire.into();
        assert!(normalized.success);
        assert_eq!(normalized.transaction, "0xabc123");
    }

    #[test]
    fn test_settle_response_wire_legacy_tx_id() {
        let wire: SettleResponseWire = serde_json::from_value(json!({
            "success": true,
            "txId": "deadbeef",
            "network": "stacks:mainnet",
        }))
        .unwrap();
        let normalized: SettleResponse = wire.into();
        assert_eq!(normalized.transaction, "deadbeef");
        assert_eq!(normalized.payer, None);
    }

    #[test]
    fn test_settle_response_evidence_encoding() {
        let response = SettleResponse {
            success: true,
            transaction: "0xabc".to_string(),
            network: NetworkId::stacks_testnet(),
            payer: Some("ST2CY...".to_string()),
            error_reason: None,
        };
        let encoded = response.to_base64().unwrap();
        use base64::{engine::general_purpose, Engine as _};
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        let back: SettleResponse = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(back, response);
    }
}
