//! Token asset identifiers and the token/network registry
//!
//! The registry is a static lookup from `(network, token symbol)` to an
//! asset identifier. The native unit of a chain uses the symbolic
//! identifier `NATIVE`; a fungible token uses the structured form
//! `<contract-address>::<token-name>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::network::NetworkId;
use crate::{GatewayError, Result};

/// Identifies the on-chain asset a payment is denominated in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetId {
    /// The chain's native unit (STX, ETH, ...)
    Native,
    /// A fungible token deployed at a contract
    Contract {
        /// Deploying contract address
        address: String,
        /// Token name within the contract
        token_name: String,
    },
}

impl AssetId {
    /// Create a contract-backed asset identifier
    pub fn contract(address: impl Into<String>, token_name: impl Into<String>) -> Self {
        Self::Contract {
            address: address.into(),
            token_name: token_name.into(),
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("NATIVE"),
            Self::Contract {
                address,
                token_name,
            } => write!(f, "{}::{}", address, token_name),
        }
    }
}

impl FromStr for AssetId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "NATIVE" {
            return Ok(Self::Native);
        }
        let (address, token_name) = s
            .split_once("::")
            .ok_or_else(|| GatewayError::decode(format!("malformed asset identifier: {}", s)))?;
        if address.is_empty() || token_name.is_empty() {
            return Err(GatewayError::decode(format!(
                "malformed asset identifier: {}",
                s
            )));
        }
        Ok(Self::contract(address, token_name))
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Metadata for one token on one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token symbol (e.g. "STX", "sBTC", "USDC")
    pub symbol: String,
    /// Human-readable token name
    pub name: String,
    /// Minor units per whole token, as a power of ten
    pub decimals: u8,
    /// Asset identifier on this network
    pub asset: AssetId,
}

/// Static lookup of `(network, token symbol)` to asset metadata
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    entries: HashMap<(NetworkId, String), TokenInfo>,
}

impl TokenRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the well-known deployments
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for network in [NetworkId::stacks_mainnet(), NetworkId::stacks_testnet()] {
            registry.register(
                network.clone(),
                TokenInfo {
                    symbol: "STX".to_string(),
                    name: "Stacks".to_string(),
                    decimals: 6,
                    asset: AssetId::Native,
                },
            );
        }
        registry.register(
            NetworkId::stacks_mainnet(),
            TokenInfo {
                symbol: "sBTC".to_string(),
                name: "sBTC".to_string(),
                decimals: 8,
                asset: AssetId::contract(
                    "SM3VDXK3WZZSA84XXFKAFAF15NNZX32CTSG82JFQ4.sbtc-token",
                    "sbtc-token",
                ),
            },
        );
        registry.register(
            NetworkId::stacks_testnet(),
            TokenInfo {
                symbol: "sBTC".to_string(),
                name: "sBTC".to_string(),
                decimals: 8,
                asset: AssetId::contract(
                    "ST1F7QA2MDF17S807EPA36TSS8AMEFY4KA9TVGWXT.sbtc-token",
                    "sbtc-token",
                ),
            },
        );
        registry.register(
            NetworkId::eip155(8453),
            TokenInfo {
                symbol: "USDC".to_string(),
                name: "USD Coin".to_string(),
                decimals: 6,
                asset: AssetId::contract(
                    "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                    "usdc",
                ),
            },
        );
        registry.register(
            NetworkId::eip155(84532),
            TokenInfo {
                symbol: "USDC".to_string(),
                name: "USDC".to_string(),
                decimals: 6,
                asset: AssetId::contract(
                    "0x036CbD53842c5426634e7929541eC2318f3dCF7e",
                    "usdc",
                ),
            },
        );
        registry
    }

    /// Register a token deployment on a network
    pub fn register(&mut self, network: NetworkId, info: TokenInfo) {
        self.entries.insert((network, info.symbol.clone()), info);
    }

    /// Look up a token by network and symbol
    pub fn get(&self, network: &NetworkId, symbol: &str) -> Option<&TokenInfo> {
        self.entries.get(&(network.clone(), symbol.to_string()))
    }

    /// Resolve a requested token symbol against an accepted-token set
    ///
    /// Rejects with `UnsupportedToken` before any facilitator call when the
    /// symbol is either unknown on the network or absent from the accepted
    /// set.
    pub fn resolve(
        &self,
        network: &NetworkId,
        symbol: &str,
        accepted: &[String],
    ) -> Result<&TokenInfo> {
        if !accepted.iter().any(|t| t == symbol) {
            return Err(GatewayError::unsupported_token(symbol));
        }
        self.get(network, symbol)
            .ok_or_else(|| GatewayError::unsupported_token(symbol))
    }

    /// All token symbols registered for a network
    pub fn symbols_for(&self, network: &NetworkId) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(n, _)| n == network)
            .map(|(_, s)| s.as_str())
            .collect()
    }
}
