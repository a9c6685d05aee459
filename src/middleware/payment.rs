//! Payment gateway middleware
//!
//! Runs the per-request state machine: no proof header means a 402 with
//! payment requirements; a proof header is decoded, routed to its network
//! capability, settled through the facilitator, and on success the
//! request is handed to the protected handler with a [`PaymentContext`]
//! attached and settlement evidence stamped on the response.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::config::{GatewayConfig, RouteConfig};
use crate::codec::{decode_payment_header, DecodedPayment};
use crate::context::{evidence_headers, PaymentContext};
use crate::router::NetworkRouter;
use crate::types::{
    headers, NetworkConfig, PaymentPayload, PaymentRequirement, ProtocolVersion, SettleResponse,
    TokenInfo, TokenRegistry,
};
use crate::{GatewayError, Result};

/// Axum middleware guarding one route with x402 payments
#[derive(Clone)]
pub struct PaymentGateway {
    config: GatewayConfig,
    router: NetworkRouter,
}

/// Outcome of processing one request
#[derive(Debug)]
pub enum PaymentDecision {
    /// Payment settled; the handler ran and evidence headers are attached
    Settled {
        /// The handler's response with evidence headers
        response: Response,
        /// The normalized settlement result
        settlement: SettleResponse,
    },
    /// No proof was presented; a 402 with requirements was returned
    PaymentRequired {
        /// The 402 response
        response: Response,
    },
    /// The proof was rejected before or during settlement
    Rejected {
        /// The error response
        response: Response,
    },
}

impl PaymentGateway {
    /// Build a gateway from a route configuration
    ///
    /// Validation runs here: a missing payee address or facilitator URL
    /// is a startup failure, never a request-time one.
    pub fn new(route: RouteConfig, registry: TokenRegistry) -> Result<Self> {
        let config = GatewayConfig::new(route, registry)?;
        let router = NetworkRouter::from_configs(&config.route.networks)?;
        Ok(Self { config, router })
    }

    /// The validated route configuration
    pub fn route(&self) -> &RouteConfig {
        &self.config.route
    }

    /// The network router
    pub fn router(&self) -> &NetworkRouter {
        &self.router
    }

    /// Process one request through the payment state machine
    pub async fn process(&self, mut request: Request, next: Next) -> PaymentDecision {
        let uri = request.uri().to_string();

        let payment_header = request
            .headers()
            .get(headers::PAYMENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let token_header = request
            .headers()
            .get(headers::PAYMENT_TOKEN)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let Some(header_value) = payment_header else {
            return PaymentDecision::PaymentRequired {
                response: self.payment_required_response(&uri, "Payment Required"),
            };
        };

        let settled = self
            .settle_proof(&header_value, token_header.as_deref(), &uri)
            .await;
        let (payload, token, settlement) = match settled {
            Ok(outcome) => outcome,
            Err(e) => {
                return PaymentDecision::Rejected {
                    response: self.error_response(&e, &uri),
                }
            }
        };

        if !settlement.success {
            let reason = settlement
                .error_reason
                .clone()
                .unwrap_or_else(|| "payment rejected".to_string());
            let err = GatewayError::payment_invalid(reason);
            return PaymentDecision::Rejected {
                response: self.error_response(&err, &uri),
            };
        }

        let context = match PaymentContext::from_settlement(&settlement, &payload.requirement, token)
        {
            Ok(context) => context,
            Err(e) => {
                return PaymentDecision::Rejected {
                    response: self.error_response(&e, &uri),
                }
            }
        };

        tracing::debug!(
            network = %context.network,
            transaction = %context.transaction,
            "payment settled, handing off to resource handler"
        );

        request.extensions_mut().insert(context);
        let mut response = next.run(request).await;

        if let Ok(evidence) = evidence_headers(&settlement) {
            for (name, value) in evidence {
                response.headers_mut().insert(name, value);
            }
        }

        PaymentDecision::Settled {
            response,
            settlement,
        }
    }

    /// Decode, route and settle a proof header
    ///
    /// Returns the payload sent to the facilitator, the token symbol the
    /// payment was made in, and the normalized settlement result. Token
    /// validation happens before any facilitator call.
    async fn settle_proof(
        &self,
        header_value: &str,
        token_header: Option<&str>,
        request_uri: &str,
    ) -> Result<(PaymentPayload, String, SettleResponse)> {
        let route = &self.config.route;
        let registry = &self.config.registry;
        let allow_legacy = route.version == ProtocolVersion::V1;

        let decoded = decode_payment_header(header_value, token_header, allow_legacy)?;

        let (payload, token) = match decoded {
            DecodedPayment::Structured(payload) => {
                let requirement = &payload.requirement;
                let network_config = route
                    .network_config(&requirement.network)
                    .ok_or_else(|| {
                        GatewayError::unsupported_network(requirement.network.to_string())
                    })?;

                let token = requirement
                    .token_type()
                    .map(String::from)
                    .unwrap_or_else(|| {
                        network_config
                            .accepted_tokens
                            .first()
                            .cloned()
                            .unwrap_or_default()
                    });
                let info = registry.resolve(
                    &requirement.network,
                    &token,
                    &network_config.accepted_tokens,
                )?;

                self.check_against_advertised(requirement, network_config, info)?;
                (payload, token)
            }
            DecodedPayment::Legacy(legacy) => {
                let declared = route.declared_network.clone().or_else(|| {
                    // A single-network route implicitly declares its network.
                    (route.networks.len() == 1).then(|| route.networks[0].network.clone())
                });
                let network = self.router.resolve_legacy_network(
                    &legacy.proof,
                    declared.as_ref(),
                    &route.network_ids(),
                )?;
                let network_config = route
                    .network_config(&network)
                    .ok_or_else(|| GatewayError::unsupported_network(network.to_string()))?;

                let token = legacy
                    .token_type
                    .clone()
                    .or_else(|| network_config.accepted_tokens.first().cloned())
                    .unwrap_or_default();
                registry.resolve(&network, &token, &network_config.accepted_tokens)?;

                let requirement = route.requirement_for(network_config, &token, registry)?;
                let mut payload = PaymentPayload::new(
                    route.resource_descriptor(request_uri),
                    requirement,
                    legacy.proof,
                );
                payload.x402_version = ProtocolVersion::V1;
                (payload, token)
            }
        };

        let capability = self.router.capability_for(&payload.requirement.network)?;
        let settlement = capability.settle(&payload, &payload.requirement).await?;
        Ok((payload, token, settlement))
    }

    /// Check a client-selected requirement against what this route offers
    ///
    /// The requirement is forwarded to the facilitator verbatim, so every
    /// field the facilitator acts on must match what the route advertised:
    /// a rewritten payee or asset would settle a payment that does not pay
    /// for this resource.
    fn check_against_advertised(
        &self,
        requirement: &PaymentRequirement,
        network_config: &NetworkConfig,
        info: &TokenInfo,
    ) -> Result<()> {
        let route = &self.config.route;
        if requirement.scheme != crate::types::schemes::EXACT {
            return Err(GatewayError::decode(format!(
                "unsupported scheme: {}",
                requirement.scheme
            )));
        }
        if requirement.amount_as_units()? != route.price {
            return Err(GatewayError::payment_invalid(format!(
                "amount {} does not match advertised price {}",
                requirement.amount, route.price
            )));
        }
        if requirement.pay_to != network_config.pay_to {
            return Err(GatewayError::payment_invalid(format!(
                "payee {} does not match advertised payee {}",
                requirement.pay_to, network_config.pay_to
            )));
        }
        if requirement.asset != info.asset {
            return Err(GatewayError::payment_invalid(format!(
                "asset {} does not match advertised asset {}",
                requirement.asset, info.asset
            )));
        }
        Ok(())
    }

    /// Build the 402 response with payment requirements
    fn payment_required_response(&self, request_uri: &str, error: &str) -> Response {
        let body = self
            .config
            .route
            .build_payment_required(&self.config.registry, request_uri, error);
        match body.and_then(|b| b.to_value()) {
            Ok(value) => (StatusCode::PAYMENT_REQUIRED, Json(value)).into_response(),
            Err(e) => {
                // Unreachable after startup validation, but never panic
                // on a request path.
                tracing::error!(error = %e, "failed to build payment requirements");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    /// Map a gateway error to its HTTP response
    ///
    /// `PaymentInvalid` responses include fresh requirements so the
    /// client can re-fetch and produce a new proof; the stale one cannot
    /// be retried.
    fn error_response(&self, error: &GatewayError, request_uri: &str) -> Response {
        if matches!(error, GatewayError::PaymentInvalid { .. }) {
            return self.payment_required_response(request_uri, &error.to_string());
        }
        let body = json!({
            "error": error.to_string(),
            "code": error.error_code(),
        });
        (error.status_code(), Json(body)).into_response()
    }
}

impl std::fmt::Debug for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGateway")
            .field("route", &self.config.route)
            .finish()
    }
}

/// Axum middleware function for the payment gateway
pub async fn payment_gateway_middleware(
    State(gateway): State<PaymentGateway>,
    request: Request,
    next: Next,
) -> Response {
    match gateway.process(request, next).await {
        PaymentDecision::Settled { response, .. } => response,
        PaymentDecision::PaymentRequired { response } => response,
        PaymentDecision::Rejected { response } => response,
    }
}
