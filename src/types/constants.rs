//! Common constants for networks, schemes and headers

/// Well-known network identifiers
pub mod networks {
    use crate::types::NetworkId;

    /// Stacks mainnet
    pub const STACKS_MAINNET: &str = "stacks:mainnet";
    /// Stacks testnet
    pub const STACKS_TESTNET: &str = "stacks:testnet";
    /// Base mainnet
    pub const BASE_MAINNET: &str = "eip155:8453";
    /// Base Sepolia testnet
    pub const BASE_SEPOLIA: &str = "eip155:84532";

    /// Check if a network identifier belongs to a supported family
    pub fn is_supported(network: &str) -> bool {
        network
            .parse::<NetworkId>()
            .and_then(|id| id.family())
            .is_ok()
    }

    /// All well-known networks
    pub fn all_known() -> Vec<&'static str> {
        vec![STACKS_MAINNET, STACKS_TESTNET, BASE_MAINNET, BASE_SEPOLIA]
    }
}

/// Common payment schemes
pub mod schemes {
    /// Exact payment scheme
    pub const EXACT: &str = "exact";
}

/// HTTP header names used by the protocol
pub mod headers {
    /// Request header carrying the payment proof
    pub const PAYMENT: &str = "X-PAYMENT";
    /// Companion request header naming the selected token type
    /// (legacy format only, where the proof carries no token tag)
    pub const PAYMENT_TOKEN: &str = "X-PAYMENT-TOKEN";
    /// Response header carrying the base64 settlement evidence
    pub const PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";
    /// Response header carrying the payer address
    pub const PAYMENT_PAYER: &str = "X-PAYMENT-PAYER";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks_are_supported() {
        for network in networks::all_known() {
            assert!(networks::is_supported(network), "{network}");
        }
        assert!(!networks::is_supported("cosmos:hub"));
        assert!(!networks::is_supported("not-namespaced"));
    }
}
