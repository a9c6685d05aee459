//! Network router
//!
//! Maps a decoded payment to the verification capability for its ledger
//! family. Routing is a pure function of the network id: the namespace
//! prefix selects the capability, and the same id always routes to the
//! same one. Adding a network family means registering one more
//! [`NetworkCapability`] implementation, not branching elsewhere.
//!
//! Legacy proofs carry no network tag. An explicit network declared by the
//! route configuration always wins; only when none is declared does the
//! router fall back to proof-shape heuristics, and that path is logged as
//! a correctness risk every time it is taken. The heuristic is a
//! compatibility shim for old clients, not a supported dispatch mechanism.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::proof_digest_prefix;
use crate::facilitator::FacilitatorClient;
use crate::types::{
    FacilitatorConfig, NetworkConfig, NetworkFamily, NetworkId, PaymentPayload,
    PaymentRequirement, SettleResponse,
};
use crate::{GatewayError, Result};

/// A per-family verification capability
///
/// Implementations perform family-specific preflight on the proof and
/// delegate the actual verification and broadcast to the facilitator
/// configured for the requirement's network.
#[async_trait]
pub trait NetworkCapability: Send + Sync {
    /// The ledger family this capability serves
    fn family(&self) -> NetworkFamily;

    /// Verify and settle a payment against a requirement
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirement: &PaymentRequirement,
    ) -> Result<SettleResponse>;
}

/// Capability for Stacks networks
///
/// A Stacks proof is a serialized signed transaction in plain hex, no
/// `0x` prefix.
pub struct StacksCapability {
    facilitators: HashMap<NetworkId, FacilitatorClient>,
}

impl StacksCapability {
    /// Build from the Stacks-family network configurations
    pub fn new(configs: &[NetworkConfig]) -> Result<Self> {
        Ok(Self {
            facilitators: facilitators_for(configs, NetworkFamily::Stacks)?,
        })
    }
}

#[async_trait]
impl NetworkCapability for StacksCapability {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Stacks
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirement: &PaymentRequirement,
    ) -> Result<SettleResponse> {
        if payload.proof.starts_with("0x") || !is_hex(&payload.proof) {
            return Err(GatewayError::decode(
                "proof is not a hex-serialized Stacks transaction",
            ));
        }
        let facilitator = self.facilitators.get(&requirement.network).ok_or_else(|| {
            GatewayError::unsupported_network(requirement.network.to_string())
        })?;
        facilitator.settle(payload, requirement).await
    }
}

/// Capability for EVM networks
///
/// An EVM proof is a `0x`-prefixed signed authorization.
pub struct EvmCapability {
    facilitators: HashMap<NetworkId, FacilitatorClient>,
}

impl EvmCapability {
    /// Build from the EVM-family network configurations
    pub fn new(configs: &[NetworkConfig]) -> Result<Self> {
        Ok(Self {
            facilitators: facilitators_for(configs, NetworkFamily::Evm)?,
        })
    }
}

#[async_trait]
impl NetworkCapability for EvmCapability {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Evm
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirement: &PaymentRequirement,
    ) -> Result<SettleResponse> {
        let stripped = payload
            .proof
            .strip_prefix("0x")
            .ok_or_else(|| GatewayError::decode("proof is not a 0x-prefixed EVM authorization"))?;
        if !is_hex(stripped) {
            return Err(GatewayError::decode("proof is not valid hex"));
        }
        let facilitator = self.facilitators.get(&requirement.network).ok_or_else(|| {
            GatewayError::unsupported_network(requirement.network.to_string())
        })?;
        facilitator.settle(payload, requirement).await
    }
}

fn facilitators_for(
    configs: &[NetworkConfig],
    family: NetworkFamily,
) -> Result<HashMap<NetworkId, FacilitatorClient>> {
    let mut facilitators = HashMap::new();
    for config in configs {
        if config.network.family()? != family {
            continue;
        }
        let client = FacilitatorClient::new(FacilitatorConfig::new(&config.facilitator_url))?;
        facilitators.insert(config.network.clone(), client);
    }
    Ok(facilitators)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Routes payments to the capability for their network family
#[derive(Clone, Default)]
pub struct NetworkRouter {
    capabilities: HashMap<&'static str, Arc<dyn NetworkCapability>>,
}

impl NetworkRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router covering every family present in the configurations
    pub fn from_configs(configs: &[NetworkConfig]) -> Result<Self> {
        let mut router = Self::new();
        let families: std::collections::HashSet<NetworkFamily> = configs
            .iter()
            .map(|c| c.network.family())
            .collect::<Result<_>>()?;
        for family in families {
            let capability: Arc<dyn NetworkCapability> = match family {
                NetworkFamily::Stacks => Arc::new(StacksCapability::new(configs)?),
                NetworkFamily::Evm => Arc::new(EvmCapability::new(configs)?),
            };
            router.register(capability);
        }
        Ok(router)
    }

    /// Register a capability under its family namespace
    pub fn register(&mut self, capability: Arc<dyn NetworkCapability>) {
        self.capabilities
            .insert(capability.family().namespace(), capability);
    }

    /// Select the capability for a network id
    ///
    /// Pure in the network id: equal ids always resolve to the same
    /// capability. An unrecognized namespace is `UnsupportedNetwork`.
    pub fn capability_for(&self, network: &NetworkId) -> Result<Arc<dyn NetworkCapability>> {
        self.capabilities
            .get(network.namespace.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::unsupported_network(network.to_string()))
    }

    /// Determine the network for a legacy proof
    ///
    /// The route's declared network is authoritative whenever present.
    /// Without one, the proof shape picks a family among the route's
    /// configured networks; that detection is weak (prefix and character
    /// class only) and is logged as such.
    pub fn resolve_legacy_network(
        &self,
        proof: &str,
        declared: Option<&NetworkId>,
        configured: &[NetworkId],
    ) -> Result<NetworkId> {
        if let Some(network) = declared {
            self.capability_for(network)?;
            return Ok(network.clone());
        }

        let family = infer_family_from_proof(proof)?;
        tracing::warn!(
            proof_digest = %proof_digest_prefix(proof),
            inferred_family = %family,
            "no declared network for legacy proof; falling back to shape \
             heuristics, which cannot distinguish chains within a family"
        );

        configured
            .iter()
            .find(|n| n.family().map(|f| f == family).unwrap_or(false))
            .cloned()
            .ok_or_else(|| {
                GatewayError::unsupported_network(format!(
                    "no configured {} network for legacy proof",
                    family
                ))
            })
    }
}

/// Guess the ledger family from the shape of an opaque proof
///
/// `0x`-prefixed hex reads as an EVM authorization; bare hex as a
/// serialized Stacks transaction. Anything else is undecidable.
fn infer_family_from_proof(proof: &str) -> Result<NetworkFamily> {
    if let Some(stripped) = proof.strip_prefix("0x") {
        if is_hex(stripped) {
            return Ok(NetworkFamily::Evm);
        }
    } else if is_hex(proof) {
        return Ok(NetworkFamily::Stacks);
    }
    Err(GatewayError::decode(
        "cannot infer network family from proof shape",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_configs() -> Vec<NetworkConfig> {
        vec![
            NetworkConfig::new(
                NetworkId::stacks_testnet(),
                "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
                "https://stacks-facilitator.example.com",
            )
            .with_accepted_tokens(vec!["STX".to_string()]),
            NetworkConfig::new(
                NetworkId::eip155(84532),
                "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "https://evm-facilitator.example.com",
            )
            .with_accepted_tokens(vec!["USDC".to_string()]),
        ]
    }

    #[test]
    fn test_routing_is_pure_in_network_id() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        let a = router.capability_for(&NetworkId::stacks_testnet()).unwrap();
        let b = router.capability_for(&NetworkId::stacks_testnet()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.family(), NetworkFamily::Stacks);
    }

    #[test]
    fn test_namespace_selects_family() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        // Same namespace, different reference: still the same capability.
        let mainnet = router.capability_for(&NetworkId::stacks_mainnet()).unwrap();
        assert_eq!(mainnet.family(), NetworkFamily::Stacks);
        let evm = router.capability_for(&NetworkId::eip155(8453)).unwrap();
        assert_eq!(evm.family(), NetworkFamily::Evm);
    }

    #[test]
    fn test_unknown_namespace_is_unsupported() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        match router.capability_for(&NetworkId::new("cosmos", "hub")) {
            Err(e) => assert_eq!(e.error_code(), "unsupported_network"),
            Ok(_) => panic!("expected unsupported network error"),
        }
    }

    #[test]
    fn test_declared_network_beats_heuristic() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        let configured = vec![NetworkId::stacks_testnet(), NetworkId::eip155(84532)];
        // The proof looks like an EVM authorization, but the route says Stacks.
        let network = router
            .resolve_legacy_network(
                "0xdeadbeef",
                Some(&NetworkId::stacks_testnet()),
                &configured,
            )
            .unwrap();
        assert_eq!(network, NetworkId::stacks_testnet());
    }

    #[test]
    fn test_heuristic_fallback() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        let configured = vec![NetworkId::stacks_testnet(), NetworkId::eip155(84532)];
        assert_eq!(
            router
                .resolve_legacy_network("80800000000400ab", None, &configured)
                .unwrap(),
            NetworkId::stacks_testnet()
        );
        assert_eq!(
            router
                .resolve_legacy_network("0xdeadbeef", None, &configured)
                .unwrap(),
            NetworkId::eip155(84532)
        );
    }

    #[test]
    fn test_undecidable_proof_is_decode_error() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        let err = router
            .resolve_legacy_network("zzz-not-hex", None, &[NetworkId::stacks_testnet()])
            .unwrap_err();
        assert_eq!(err.error_code(), "decode_error");
    }

    #[test]
    fn test_heuristic_with_no_matching_family() {
        let router = NetworkRouter::from_configs(&test_configs()).unwrap();
        // EVM-shaped proof, but the route only configures Stacks.
        let err = router
            .resolve_legacy_network("0xdeadbeef", None, &[NetworkId::stacks_testnet()])
            .unwrap_err();
        assert_eq!(err.error_code(), "unsupported_network");
    }
}
