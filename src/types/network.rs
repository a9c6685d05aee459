//! Network identifiers and per-network configuration
//!
//! Networks are identified by a namespaced `family:reference` string
//! (CAIP-2 style), e.g. `stacks:testnet` or `eip155:8453`. The namespace
//! selects the verification capability; the reference names the concrete
//! chain within that family.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{GatewayError, Result};

/// A namespaced network identifier of the form `family:reference`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkId {
    /// Ledger family namespace (e.g. "stacks", "eip155")
    pub namespace: String,
    /// Chain reference within the family (e.g. "testnet", "8453")
    pub reference: String,
}

impl NetworkId {
    /// Create a network id from namespace and reference
    pub fn new(namespace: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Stacks mainnet identifier
    pub fn stacks_mainnet() -> Self {
        Self::new("stacks", "mainnet")
    }

    /// Stacks testnet identifier
    pub fn stacks_testnet() -> Self {
        Self::new("stacks", "testnet")
    }

    /// An EVM chain identifier from its numeric chain id
    pub fn eip155(chain_id: u64) -> Self {
        Self::new("eip155", chain_id.to_string())
    }

    /// The network family this id belongs to, if supported
    pub fn family(&self) -> Result<NetworkFamily> {
        NetworkFamily::from_namespace(&self.namespace)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl FromStr for NetworkId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, reference) = s
            .split_once(':')
            .ok_or_else(|| GatewayError::decode(format!("network id missing ':': {}", s)))?;
        if namespace.is_empty() {
            return Err(GatewayError::decode("network id has empty namespace"));
        }
        if reference.is_empty() {
            return Err(GatewayError::decode("network id has empty reference"));
        }
        Ok(Self::new(namespace, reference))
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fixed set of ledger families the router can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkFamily {
    /// Stacks chains (`stacks:*`)
    Stacks,
    /// EVM chains (`eip155:*`)
    Evm,
}

impl NetworkFamily {
    /// Resolve a namespace string to a family
    pub fn from_namespace(namespace: &str) -> Result<Self> {
        match namespace {
            "stacks" => Ok(Self::Stacks),
            "eip155" => Ok(Self::Evm),
            other => Err(GatewayError::unsupported_network(other)),
        }
    }

    /// The namespace string for this family
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Stacks => "stacks",
            Self::Evm => "eip155",
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Per-network payment configuration
///
/// Immutable after startup and shared across requests. `validate` runs
/// during gateway construction so a missing payee address or facilitator
/// URL aborts startup instead of producing an invalid 402 at request time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The network this configuration applies to
    pub network: NetworkId,
    /// Recipient address for payments on this network
    #[serde(rename = "payTo")]
    pub pay_to: String,
    /// Base URL of the facilitator that settles for this network
    #[serde(rename = "facilitatorUrl")]
    pub facilitator_url: String,
    /// Token symbols accepted on this network (e.g. ["STX", "sBTC"])
    #[serde(rename = "acceptedTokens")]
    pub accepted_tokens: Vec<String>,
}

impl NetworkConfig {
    /// Create a new network configuration
    pub fn new(
        network: NetworkId,
        pay_to: impl Into<String>,
        facilitator_url: impl Into<String>,
    ) -> Self {
        Self {
            network,
            pay_to: pay_to.into(),
            facilitator_url: facilitator_url.into(),
            accepted_tokens: Vec::new(),
        }
    }

    /// Set the accepted token symbols
    pub fn with_accepted_tokens(mut self, tokens: Vec<String>) -> Self {
        self.accepted_tokens = tokens;
        self
    }

    /// Validate this configuration, failing fast on missing fields
    pub fn validate(&self) -> Result<()> {
        self.network.family()?;
        if self.pay_to.is_empty() {
            return Err(GatewayError::misconfigured_route(format!(
                "network {} has no payee address",
                self.network
            )));
        }
        if self.facilitator_url.is_empty() {
            return Err(GatewayError::misconfigured_route(format!(
                "network {} has no facilitator URL",
                self.network
            )));
        }
        url::Url::parse(&self.facilitator_url).map_err(|e| {
            GatewayError::misconfigured_route(format!(
                "network {} has invalid facilitator URL: {}",
                self.network, e
            ))
        })?;
        if self.accepted_tokens.is_empty() {
            return Err(GatewayError::misconfigured_route(format!(
                "network {} accepts no tokens",
                self.network
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_id_display_roundtrip() {
        let id = NetworkId::stacks_testnet();
        assert_eq!(id.to_string(), "stacks:testnet");
        let parsed: NetworkId = "stacks:testnet".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_network_id_parse_errors() {
        assert!("stacks".parse::<NetworkId>().is_err());
        assert!(":testnet".parse::<NetworkId>().is_err());
        assert!("stacks:".parse::<NetworkId>().is_err());
    }

    #[test]
    fn test_network_family() {
        assert_eq!(
            NetworkId::stacks_mainnet().family().unwrap(),
            NetworkFamily::Stacks
        );
        assert_eq!(NetworkId::eip155(8453).family().unwrap(), NetworkFamily::Evm);
        assert!(NetworkId::new("cosmos", "hub").family().is_err());
    }

    #[test]
    fn test_network_id_serde_is_bare_string() {
        let id = NetworkId::eip155(84532);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"eip155:84532\"");
        let back: NetworkId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_network_config_validation() {
        let config = NetworkConfig::new(
            NetworkId::stacks_testnet(),
            "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
            "https://facilitator.example.com",
        )
        .with_accepted_tokens(vec!["STX".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_config_missing_payee_fails() {
        let config = NetworkConfig::new(
            NetworkId::stacks_testnet(),
            "",
            "https://facilitator.example.com",
        )
        .with_accepted_tokens(vec!["STX".to_string()]);
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_code(), "misconfigured_route");
    }

    #[test]
    fn test_network_config_bad_facilitator_url_fails() {
        let config = NetworkConfig::new(
            NetworkId::stacks_testnet(),
            "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
            "not a url",
        )
        .with_accepted_tokens(vec!["STX".to_string()]);
        assert!(config.validate().is_err());
    }
}
