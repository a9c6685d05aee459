//! Payment header codec
//!
//! Decodes the `X-PAYMENT` request header into a payment payload. Two wire
//! formats coexist:
//!
//! - **Structured**: base64-encoded JSON, self-describing (protocol
//!   version, accepted requirement, proof). The inverse of
//!   [`PaymentPayload::to_base64`]; decode(encode(p)) == p.
//! - **Legacy**: the header value IS the opaque proof. It carries no
//!   network or token tag, so disambiguation relies on the companion
//!   `X-PAYMENT-TOKEN` header and on route-side information (see the
//!   router module).
//!
//! Proof bytes never appear in logs or error messages; only a short
//! digest prefix is logged.

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

use crate::types::PaymentPayload;
use crate::{GatewayError, Result};

/// A payment proof decoded from the request headers
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayment {
    /// Self-describing structured payload
    Structured(PaymentPayload),
    /// Opaque legacy proof with optional companion token type
    Legacy(LegacyProof),
}

impl DecodedPayment {
    /// The opaque proof string, whichever format carried it
    pub fn proof(&self) -> &str {
        match self {
            Self::Structured(payload) => &payload.proof,
            Self::Legacy(legacy) => &legacy.proof,
        }
    }
}

/// An opaque legacy proof and its side information
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyProof {
    /// The raw header value, an opaque signed proof
    pub proof: String,
    /// Token symbol from the companion header, if sent
    pub token_type: Option<String>,
}

/// Decode the payment header, structured format first
///
/// A structured header base64-decodes to a JSON object. If the value
/// decodes to something that starts with `{`, it is treated as structured
/// and any parse failure is a hard `DecodeError` rather than a silent
/// fallback to the legacy path; a proof that happens to be valid base64
/// never starts with `{` once decoded.
///
/// `allow_legacy` reflects the route's protocol version: on a structured
/// (v2) route there is no legacy format, so anything that is not a valid
/// structured header is a `DecodeError` rather than an opaque proof.
pub fn decode_payment_header(
    header_value: &str,
    token_header: Option<&str>,
    allow_legacy: bool,
) -> Result<DecodedPayment> {
    if header_value.is_empty() {
        return Err(GatewayError::decode("empty payment header"));
    }

    match general_purpose::STANDARD.decode(header_value) {
        Ok(decoded) if decoded.first() == Some(&b'{') => {
            let payload = PaymentPayload::from_base64(header_value)?;
            tracing::debug!(
                proof_digest = %proof_digest_prefix(&payload.proof),
                network = %payload.requirement.network,
                "decoded structured payment payload"
            );
            return Ok(DecodedPayment::Structured(payload));
        }
        Ok(_) if !allow_legacy => {
            return Err(GatewayError::decode(
                "payment header is not a structured payload",
            ));
        }
        Err(e) if !allow_legacy => {
            return Err(GatewayError::decode(format!(
                "invalid base64 in payment header: {}",
                e
            )));
        }
        _ => {}
    }

    tracing::debug!(
        proof_digest = %proof_digest_prefix(header_value),
        "payment header is not structured, treating as legacy opaque proof"
    );
    Ok(DecodedPayment::Legacy(LegacyProof {
        proof: header_value.to_string(),
        token_type: token_header.map(String::from),
    }))
}

/// Encode a structured payload to its header value
///
/// Exact inverse of [`decode_payment_header`] for the structured format.
pub fn encode_payment_header(payload: &PaymentPayload) -> Result<String> {
    payload.to_base64()
}

/// Full SHA-256 digest of a proof, hex encoded
///
/// Used as the dedup-cache key and for redacted logging.
pub fn proof_digest(proof: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(proof.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short digest prefix for log lines
pub fn proof_digest_prefix(proof: &str) -> String {
    let digest = proof_digest(proof);
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetId, NetworkId, PaymentRequirement, ResourceDescriptor};
    use serde_json::json;

    fn test_payload() -> PaymentPayload {
        PaymentPayload::new(
            ResourceDescriptor::new(
                "https://api.example.com/data",
                "Data access",
                "application/json",
            ),
            PaymentRequirement::new(
                NetworkId::stacks_testnet(),
                AssetId::Native,
                "1000",
                "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
                60,
            ),
            "80800000000400a1b2c3",
        )
    }

    #[test]
    fn test_structured_roundtrip_law() {
        let payload = test_payload();
        let header = encode_payment_header(&payload).unwrap();
        let decoded = decode_payment_header(&header, None, true).unwrap();
        assert_eq!(decoded, DecodedPayment::Structured(payload));
    }

    #[test]
    fn test_legacy_header_passes_through() {
        let decoded = decode_payment_header("80800000000400a1b2c3", Some("STX"), true).unwrap();
        match decoded {
            DecodedPayment::Legacy(legacy) => {
                assert_eq!(legacy.proof, "80800000000400a1b2c3");
                assert_eq!(legacy.token_type.as_deref(), Some("STX"));
            }
            other => panic!("expected legacy, got {:?}", other),
        }
    }

    #[test]
    fn test_structured_with_bad_json_is_hard_error() {
        // Base64 of "{ definitely not json" - declares itself structured, then fails.
        let header = base64::engine::general_purpose::STANDARD.encode("{ definitely not json");
        let err = decode_payment_header(&header, None, true).unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_structured_with_missing_fields_is_hard_error() {
        let header =
            base64::engine::general_purpose::STANDARD.encode(json!({"x402Version": 2}).to_string());
        assert!(decode_payment_header(&header, None, true).is_err());
    }

    #[test]
    fn test_empty_header_rejected() {
        assert!(decode_payment_header("", None, true).is_err());
    }

    #[test]
    fn test_invalid_base64_on_structured_route_is_decode_error() {
        let err = decode_payment_header("not!!valid@@base64", None, false).unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_opaque_proof_on_structured_route_is_decode_error() {
        // Valid base64, but not a JSON object once decoded.
        let header = base64::engine::general_purpose::STANDARD.encode("rawproofbytes");
        let err = decode_payment_header(&header, None, false).unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_proof_digest_stable_and_redacted() {
        let digest = proof_digest("proof-bytes");
        assert_eq!(digest, proof_digest("proof-bytes"));
        assert_eq!(digest.len(), 64);
        assert_eq!(proof_digest_prefix("proof-bytes"), digest[..16]);
        assert!(!digest.contains("proof-bytes"));
    }
}
