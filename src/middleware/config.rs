//! Route configuration and the payment-requirement builder

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{
    NetworkConfig, NetworkId, PaymentRequiredResponse, PaymentRequirement, ProtocolVersion,
    ResourceDescriptor, TokenRegistry,
};
use crate::{GatewayError, Result};

/// Configuration for one payment-protected route
///
/// Supplied by the route binding and validated once at gateway
/// construction; anything wrong with it aborts startup rather than
/// surfacing on a request.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Price in minor units of the selected token
    pub price: u128,
    /// Human-readable description of the resource
    pub description: String,
    /// MIME type of the expected response
    pub mime_type: String,
    /// Maximum time allowed for payment completion in seconds
    pub max_timeout_seconds: u32,
    /// Networks this route accepts payment on
    pub networks: Vec<NetworkConfig>,
    /// Protocol version controlling the 402 layout and header format
    pub version: ProtocolVersion,
    /// Explicit network for legacy proofs, overriding heuristics
    pub declared_network: Option<NetworkId>,
    /// Resource URL override (if different from the request URL)
    pub resource: Option<String>,
    /// Root URL used to construct full resource URLs from request paths
    pub resource_root_url: Option<String>,
}

impl RouteConfig {
    /// Create a route config with the given price in minor units
    pub fn new(price: u128) -> Self {
        Self {
            price,
            description: "Payment required".to_string(),
            mime_type: "application/json".to_string(),
            max_timeout_seconds: 60,
            networks: Vec::new(),
            version: ProtocolVersion::V2,
            declared_network: None,
            resource: None,
            resource_root_url: None,
        }
    }

    /// Set the resource description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Set the maximum timeout
    pub fn with_max_timeout_seconds(mut self, max_timeout_seconds: u32) -> Self {
        self.max_timeout_seconds = max_timeout_seconds;
        self
    }

    /// Add a network this route accepts payment on
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.networks.push(network);
        self
    }

    /// Set the protocol version
    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.version = version;
        self
    }

    /// Declare the network legacy proofs on this route belong to
    pub fn with_declared_network(mut self, network: NetworkId) -> Self {
        self.declared_network = Some(network);
        self
    }

    /// Set the resource URL
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the resource root URL
    pub fn with_resource_root_url(mut self, url: impl Into<String>) -> Self {
        self.resource_root_url = Some(url.into());
        self
    }

    /// Validate the route against the token registry
    ///
    /// Fails fast on a missing payee or facilitator URL, an empty network
    /// list, a zero price, or an accepted token the registry cannot
    /// resolve, so no request can ever see an invalid requirement.
    pub fn validate(&self, registry: &TokenRegistry) -> Result<()> {
        if self.price == 0 {
            return Err(GatewayError::misconfigured_route("price must be positive"));
        }
        if self.networks.is_empty() {
            return Err(GatewayError::misconfigured_route(
                "route accepts no networks",
            ));
        }
        for network in &self.networks {
            network.validate()?;
            for token in &network.accepted_tokens {
                if registry.get(&network.network, token).is_none() {
                    return Err(GatewayError::misconfigured_route(format!(
                        "token {} is not registered on {}",
                        token, network.network
                    )));
                }
            }
        }
        if let Some(declared) = &self.declared_network {
            if !self.networks.iter().any(|n| &n.network == declared) {
                return Err(GatewayError::misconfigured_route(format!(
                    "declared network {} is not among the route's networks",
                    declared
                )));
            }
        }
        Ok(())
    }

    /// The resource descriptor for a request to this route
    pub fn resource_descriptor(&self, request_uri: &str) -> ResourceDescriptor {
        let url = if let Some(resource) = &self.resource {
            resource.clone()
        } else if let Some(root) = &self.resource_root_url {
            format!("{}{}", root, request_uri)
        } else {
            request_uri.to_string()
        };
        ResourceDescriptor::new(url, &self.description, &self.mime_type)
    }

    /// The network configuration for a given network id, if accepted here
    pub fn network_config(&self, network: &NetworkId) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| &n.network == network)
    }

    /// Network ids this route accepts
    pub fn network_ids(&self) -> Vec<NetworkId> {
        self.networks.iter().map(|n| n.network.clone()).collect()
    }

    /// Build one requirement for a (network, token) combination
    pub fn requirement_for(
        &self,
        config: &NetworkConfig,
        token: &str,
        registry: &TokenRegistry,
    ) -> Result<PaymentRequirement> {
        let info = registry.resolve(&config.network, token, &config.accepted_tokens)?;
        let mut extra = json!({
            "tokenType": info.symbol,
            "acceptedTokens": config.accepted_tokens,
            "facilitator": config.facilitator_url,
        });
        if self.version == ProtocolVersion::V1 {
            // The legacy layout carries nonce and expiry per requirement.
            let expires_at = Utc::now() + Duration::seconds(self.max_timeout_seconds as i64);
            extra["nonce"] = json!(Uuid::new_v4().to_string());
            extra["expiresAt"] = json!(expires_at.to_rfc3339());
        }
        Ok(PaymentRequirement::new(
            config.network.clone(),
            info.asset.clone(),
            self.price.to_string(),
            &config.pay_to,
            self.max_timeout_seconds,
        )
        .with_extra(extra))
    }

    /// Build the full 402 body for this route
    ///
    /// One requirement per (network, token) combination offered, in
    /// configuration order.
    pub fn build_payment_required(
        &self,
        registry: &TokenRegistry,
        request_uri: &str,
        error: impl Into<String>,
    ) -> Result<PaymentRequiredResponse> {
        let mut accepts = Vec::new();
        for network in &self.networks {
            for token in &network.accepted_tokens {
                accepts.push(self.requirement_for(network, token, registry)?);
            }
        }
        if accepts.is_empty() {
            return Err(GatewayError::misconfigured_route(
                "route offers no payment options",
            ));
        }
        Ok(PaymentRequiredResponse::new(
            self.version,
            error,
            self.resource_descriptor(request_uri),
            accepts,
        ))
    }
}

/// Shared, validated gateway configuration
///
/// Constructed once at startup; the registry and route config are
/// read-only afterwards and safely shared across requests.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// The route being protected
    pub route: Arc<RouteConfig>,
    /// Token/network registry
    pub registry: Arc<TokenRegistry>,
}

impl GatewayConfig {
    /// Validate and freeze a route configuration
    pub fn new(route: RouteConfig, registry: TokenRegistry) -> Result<Self> {
        route.validate(&registry)?;
        Ok(Self {
            route: Arc::new(route),
            registry: Arc::new(registry),
        })
    }
}
