//! Verified-payment context
//!
//! On successful settlement the gateway attaches one immutable
//! [`PaymentContext`] to the request so the protected handler can read
//! the payment facts, and stamps evidence headers on the response so the
//! client can confirm payment out-of-band. Nothing here survives the
//! request.

use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::types::{headers, NetworkId, PaymentRequirement, SettleResponse};
use crate::{GatewayError, Result};

/// The facts of a settled payment, attached to request scope
///
/// At most one per request; constructed only from a successful
/// settlement and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentContext {
    /// Network the payment settled on
    pub network: NetworkId,
    /// Always true for an attached context
    pub verified: bool,
    /// Settlement transaction identifier
    pub transaction: String,
    /// Payer address, when the facilitator reported one
    pub payer: Option<String>,
    /// Token symbol the payment was made in
    pub token: String,
    /// Amount paid, in minor units
    pub amount: String,
}

impl PaymentContext {
    /// Build the context from a successful settlement
    ///
    /// Returns `PaymentInvalid` if called with a failed settlement; the
    /// caller is expected to have branched on `success` already.
    pub fn from_settlement(
        settlement: &SettleResponse,
        requirement: &PaymentRequirement,
        token: impl Into<String>,
    ) -> Result<Self> {
        if !settlement.success {
            return Err(GatewayError::payment_invalid(
                settlement
                    .error_reason
                    .clone()
                    .unwrap_or_else(|| "settlement failed".to_string()),
            ));
        }
        Ok(Self {
            network: settlement.network.clone(),
            verified: true,
            transaction: settlement.transaction.clone(),
            payer: settlement.payer.clone(),
            token: token.into(),
            amount: requirement.amount.clone(),
        })
    }
}

/// Response headers carrying settlement evidence
///
/// `X-PAYMENT-RESPONSE` holds the base64 JSON settlement result and
/// `X-PAYMENT-PAYER` the payer address when known.
pub fn evidence_headers(settlement: &SettleResponse) -> Result<Vec<(HeaderName, HeaderValue)>> {
    let mut out = Vec::with_capacity(2);

    let encoded = settlement.to_base64()?;
    let value = HeaderValue::from_str(&encoded)
        .map_err(|e| GatewayError::config(format!("unencodable evidence header: {}", e)))?;
    out.push((HeaderName::from_static("x-payment-response"), value));

    if let Some(payer) = &settlement.payer {
        if let Ok(value) = HeaderValue::from_str(payer) {
            out.push((HeaderName::from_static("x-payment-payer"), value));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetId, NetworkId};

    fn settled() -> SettleResponse {
        SettleResponse {
            success: true,
            transaction: "0xabc123".to_string(),
            network: NetworkId::stacks_testnet(),
            payer: Some("ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG".to_string()),
            error_reason: None,
        }
    }

    fn requirement() -> PaymentRequirement {
        PaymentRequirement::new(
            NetworkId::stacks_testnet(),
            AssetId::Native,
            "1000",
            "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
            60,
        )
    }

    #[test]
    fn test_context_from_successful_settlement() {
        let context = PaymentContext::from_settlement(&settled(), &requirement(), "STX").unwrap();
        assert!(context.verified);
        assert_eq!(context.transaction, "0xabc123");
        assert_eq!(context.amount, "1000");
        assert_eq!(context.token, "STX");
    }

    #[test]
    fn test_failed_settlement_yields_no_context() {
        let mut settlement = settled();
        settlement.success = false;
        settlement.error_reason = Some("insufficient funds".to_string());
        let err =
            PaymentContext::from_settlement(&settlement, &requirement(), "STX").unwrap_err();
        assert_eq!(err.error_code(), "payment_invalid");
    }

    #[test]
    fn test_evidence_headers_present() {
        let headers_out = evidence_headers(&settled()).unwrap();
        let names: Vec<&str> = headers_out.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&headers::PAYMENT_RESPONSE.to_lowercase().as_str()));
        assert!(names.contains(&headers::PAYMENT_PAYER.to_lowercase().as_str()));
    }

    #[test]
    fn test_evidence_headers_omit_missing_payer() {
        let mut settlement = settled();
        settlement.payer = None;
        let headers_out = evidence_headers(&settlement).unwrap();
        assert_eq!(headers_out.len(), 1);
    }
}
