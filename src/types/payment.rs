//! Payment wire types
//!
//! Defines the 402 response body in both supported protocol layouts, the
//! payment requirement entries inside it, and the client payment payload
//! carried in the `X-Payment` request header.
//!
//! Version 1 is the legacy inline layout: the amount field is named
//! `maxAmountRequired`, the resource is a flat URL string repeated per
//! requirement, and ancillary fields (nonce, expiry, facilitator URL,
//! token list) are embedded in each requirement's `extra` map. Version 2
//! is the structured layout: the resource is a nested object on the
//! envelope and the amount field is uniformly named `amount`.

use base64::{engine::general_purpose, Engine as _};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use super::network::NetworkId;
use super::token::AssetId;
use crate::{GatewayError, Result};

/// Protocol versions understood by the gateway
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVersion {
    /// Legacy inline layout
    V1,
    /// Structured layout
    #[default]
    V2,
}

impl ProtocolVersion {
    /// Numeric wire value
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Parse a numeric wire value; `None` for unknown versions
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = u8::deserialize(deserializer)?;
        Self::from_u8(v)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported x402 version: {}", v)))
    }
}

/// Descriptor of the protected resource, supplied by the route binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// URL of the protected resource
    pub url: String,
    /// Human-readable description
    pub description: String,
    /// MIME type of the expected response
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl ResourceDescriptor {
    /// Create a new resource descriptor
    pub fn new(
        url: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// One advertised way to pay for a resource
///
/// This is the canonical in-memory form; `PaymentRequiredResponse` takes
/// care of emitting the version-specific wire layouts. Serde names follow
/// the v2 structured layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequirement {
    /// Payment scheme identifier (always "exact")
    pub scheme: String,
    /// Namespaced network identifier
    pub network: NetworkId,
    /// Asset identifier on that network
    pub asset: AssetId,
    /// Required amount in minor units, as a decimal string
    pub amount: String,
    /// Recipient address
    #[serde(rename = "payTo")]
    pub pay_to: String,
    /// Maximum time allowed for payment completion in seconds
    #[serde(rename = "maxTimeoutSeconds")]
    pub max_timeout_seconds: u32,
    /// Extension map: facilitator URL, token type, accepted tokens,
    /// nonce/expiry when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirement {
    /// Create a requirement with the fixed "exact" scheme
    pub fn new(
        network: NetworkId,
        asset: AssetId,
        amount: impl Into<String>,
        pay_to: impl Into<String>,
        max_timeout_seconds: u32,
    ) -> Self {
        Self {
            scheme: crate::types::schemes::EXACT.to_string(),
            network,
            asset,
            amount: amount.into(),
            pay_to: pay_to.into(),
            max_timeout_seconds,
            extra: None,
        }
    }

    /// Set the extension map
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Parse the amount as a positive minor-unit integer
    ///
    /// Amounts are carried as strings on the wire and must never pass
    /// through floating point. Zero and negative values are invalid.
    pub fn amount_as_units(&self) -> Result<u128> {
        let units: u128 = self
            .amount
            .parse()
            .map_err(|_| GatewayError::decode(format!("invalid amount: {}", self.amount)))?;
        if units == 0 {
            return Err(GatewayError::decode("amount must be positive"));
        }
        Ok(units)
    }

    /// The amount in whole-token units for display purposes
    pub fn amount_in_decimal_units(&self, decimals: u8) -> Result<Decimal> {
        let units = self.amount_as_units()?;
        let divisor = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| GatewayError::config(format!("too many token decimals: {}", decimals)))?;
        Ok(Decimal::from(units) / Decimal::from(divisor))
    }

    /// Token symbol advertised in the extension map, if present
    pub fn token_type(&self) -> Option<&str> {
        self.extra.as_ref()?.get("tokenType")?.as_str()
    }

    /// Accepted token symbols from the extension map
    pub fn accepted_tokens(&self) -> Vec<String> {
        self.extra
            .as_ref()
            .and_then(|e| e.get("acceptedTokens"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The HTTP 402 response body
///
/// Built once per unauthenticated request and never persisted. The
/// `accepts` list is always non-empty; an empty list is a configuration
/// error caught at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequiredResponse {
    /// Protocol version controlling the wire layout
    pub version: ProtocolVersion,
    /// Human-readable error message
    pub error: String,
    /// The resource being paid for
    pub resource: ResourceDescriptor,
    /// Acceptable payment options, ordered by preference
    pub accepts: Vec<PaymentRequirement>,
}

impl PaymentRequiredResponse {
    /// Create a new 402 body
    pub fn new(
        version: ProtocolVersion,
        error: impl Into<String>,
        resource: ResourceDescriptor,
        accepts: Vec<PaymentRequirement>,
    ) -> Self {
        Self {
            version,
            error: error.into(),
            resource,
            accepts,
        }
    }

    /// Serialize to the version-specific JSON layout
    pub fn to_value(&self) -> Result<Value> {
        match self.version {
            ProtocolVersion::V1 => self.to_v1_value(),
            ProtocolVersion::V2 => self.to_v2_value(),
        }
    }

    fn to_v1_value(&self) -> Result<Value> {
        let accepts: Vec<Value> = self
            .accepts
            .iter()
            .map(|req| {
                json!({
                    "scheme": req.scheme,
                    "network": req.network,
                    "maxAmountRequired": req.amount,
                    "asset": req.asset,
                    "payTo": req.pay_to,
                    "resource": self.resource.url,
                    "description": self.resource.description,
                    "maxTimeoutSeconds": req.max_timeout_seconds,
                    "extra": req.extra.clone().unwrap_or_else(|| json!({})),
                })
            })
            .collect();
        Ok(json!({
            "x402Version": 1,
            "error": self.error,
            "accepts": accepts,
        }))
    }

    fn to_v2_value(&self) -> Result<Value> {
        Ok(json!({
            "x402Version": 2,
            "error": self.error,
            "resource": self.resource,
            "accepts": self.accepts,
        }))
    }
}

/// Client payment payload, the structured `X-Payment` header contents
///
/// Carries the requirement the client accepted verbatim, plus the opaque
/// signed proof. The proof is a pre-signed transaction or authorization;
/// the gateway never interprets its contents, only forwards it to the
/// facilitator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPayload {
    /// Protocol version identifier
    #[serde(rename = "x402Version")]
    pub x402_version: ProtocolVersion,
    /// The resource the payment is for
    pub resource: ResourceDescriptor,
    /// The requirement the client accepted
    pub requirement: PaymentRequirement,
    /// Opaque signed proof, hex or chain-native encoding
    pub proof: String,
}

impl PaymentPayload {
    /// Create a structured payment payload
    pub fn new(
        resource: ResourceDescriptor,
        requirement: PaymentRequirement,
        proof: impl Into<String>,
    ) -> Self {
        Self {
            x402_version: ProtocolVersion::V2,
            resource,
            requirement,
            proof: proof.into(),
        }
    }

    /// Decode a base64-encoded payment payload
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| GatewayError::decode(format!("invalid base64 in payment header: {}", e)))?;
        let payload: PaymentPayload = serde_json::from_slice(&decoded)
            .map_err(|e| GatewayError::decode(format!("invalid payment payload: {}", e)))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Encode the payment payload to base64
    pub fn to_base64(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    /// Check required fields after decoding
    pub fn validate(&self) -> Result<()> {
        if self.proof.is_empty() {
            return Err(GatewayError::decode("payment payload has empty proof"));
        }
        self.requirement.amount_as_units()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_requirement() -> PaymentRequirement {
        PaymentRequirement::new(
            NetworkId::stacks_testnet(),
            AssetId::Native,
            "1000",
            "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
            60,
        )
        .with_extra(json!({
            "tokenType": "STX",
            "acceptedTokens": ["STX", "sBTC"],
            "facilitator": "https://facilitator.example.com",
        }))
    }

    fn test_resource() -> ResourceDescriptor {
        ResourceDescriptor::new(
            "https://api.example.com/weather",
            "Weather data",
            "application/json",
        )
    }

    #[test]
    fn test_amount_parses_as_positive_integer() {
        let req = test_requirement();
        assert_eq!(req.amount_as_units().unwrap(), 1000);
    }

    #[test]
    fn test_zero_and_garbage_amounts_rejected() {
        let mut req = test_requirement();
        req.amount = "0".to_string();
        assert!(req.amount_as_units().is_err());
        req.amount = "1.5".to_string();
        assert!(req.amount_as_units().is_err());
        req.amount = "-3".to_string();
        assert!(req.amount_as_units().is_err());
    }

    #[test]
    fn test_amount_in_decimal_units() {
        let req = test_requirement();
        let display = req.amount_in_decimal_units(6).unwrap();
        assert_eq!(display.to_string(), "0.001");
    }

    #[test]
    fn test_oversized_decimals_is_config_error() {
        let req = test_requirement();
        assert!(req.amount_in_decimal_units(19).is_ok());
        let err = req.amount_in_decimal_units(20).unwrap_err();
        assert_eq!(err.error_code(), "config_error");
    }

    #[test]
    fn test_v1_layout() {
        let body = PaymentRequiredResponse::new(
            ProtocolVersion::V1,
            "Payment Required",
            test_resource(),
            vec![test_requirement()],
        );
        let value = body.to_value().unwrap();
        assert_eq!(value["x402Version"], 1);
        let entry = &value["accepts"][0];
        assert_eq!(entry["maxAmountRequired"], "1000");
        assert_eq!(entry["resource"], "https://api.example.com/weather");
        assert_eq!(entry["network"], "stacks:testnet");
        assert_eq!(entry["extra"]["tokenType"], "STX");
        // v1 has no nested resource object
        assert!(value.get("resource").is_none());
    }

    #[test]
    fn test_v2_layout() {
        let body = PaymentRequiredResponse::new(
            ProtocolVersion::V2,
            "Payment Required",
            test_resource(),
            vec![test_requirement()],
        );
        let value = body.to_value().unwrap();
        assert_eq!(value["x402Version"], 2);
        assert_eq!(value["resource"]["url"], "https://api.example.com/weather");
        assert_eq!(value["resource"]["mimeType"], "application/json");
        let entry = &value["accepts"][0];
        assert_eq!(entry["amount"], "1000");
        assert_eq!(entry["asset"], "NATIVE");
        assert!(entry.get("maxAmountRequired").is_none());
    }

    #[test]
    fn test_payload_base64_roundtrip() {
        let payload = PaymentPayload::new(
            test_resource(),
            test_requirement(),
            "808000000004001f...signedtx",
        );
        let encoded = payload.to_base64().unwrap();
        let decoded = PaymentPayload::from_base64(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_payload_invalid_base64_is_decode_error() {
        let err = PaymentPayload::from_base64("not!!valid@@base64").unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_payload_missing_fields_rejected() {
        let json = json!({ "x402Version": 2, "proof": "abc" }).to_string();
        let encoded = general_purpose::STANDARD.encode(json);
        assert!(PaymentPayload::from_base64(&encoded).is_err());
    }

    #[test]
    fn test_payload_empty_proof_rejected() {
        let payload = PaymentPayload::new(test_resource(), test_requirement(), "");
        let encoded = payload.to_base64().unwrap();
        let err = PaymentPayload::from_base64(&encoded).unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let json = json!({
            "x402Version": 3,
            "resource": test_resource(),
            "requirement": test_requirement(),
            "proof": "abc",
        })
        .to_string();
        let encoded = general_purpose::STANDARD.encode(json);
        assert!(PaymentPayload::from_base64(&encoded).is_err());
    }
}
