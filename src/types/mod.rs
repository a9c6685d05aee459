//! Core types for the payment gateway
//!
//! Type-safe representations of payment requirements, client payment
//! payloads, network and token configuration, and facilitator responses.
//!
//! # Organization
//!
//! - [`network`] - Namespaced network identifiers and per-network config
//! - [`token`] - Asset identifiers and the token/network registry
//! - [`payment`] - 402 bodies, payment requirements and payloads
//! - [`facilitator`] - Facilitator configuration and settlement results
//! - [`constants`] - Protocol constants (networks, schemes, headers)
//!
//! # Examples
//!
//! Building a payment requirement:
//!
//! ```
//! use x402_gateway::types::{AssetId, NetworkId, PaymentRequirement};
//!
//! let requirement = PaymentRequirement::new(
//!     NetworkId::stacks_testnet(),
//!     AssetId::Native,
//!     "1000",                                          // minor units
//!     "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",    // payee
//!     60,                                              // timeout seconds
//! );
//! assert_eq!(requirement.amount_as_units().unwrap(), 1000);
//! ```
//!
//! Encoding a payment payload for the `X-PAYMENT` header:
//!
//! ```
//! use x402_gateway::types::{
//!     AssetId, NetworkId, PaymentPayload, PaymentRequirement, ResourceDescriptor,
//! };
//!
//! # fn example() -> x402_gateway::Result<()> {
//! let resource = ResourceDescriptor::new(
//!     "https://api.example.com/weather",
//!     "Weather data",
//!     "application/json",
//! );
//! let requirement = PaymentRequirement::new(
//!     NetworkId::stacks_testnet(),
//!     AssetId::Native,
//!     "1000",
//!     "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
//!     60,
//! );
//! let payload = PaymentPayload::new(resource, requirement, "8080000000...");
//! let header_value = payload.to_base64()?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod facilitator;
pub mod network;
pub mod payment;
pub mod token;

// Re-export commonly used types
pub use constants::{headers, networks, schemes};
pub use facilitator::{
    AuthHeadersFn, AuthHeadersFnArc, FacilitatorConfig, SettleRequest, SettleResponse,
    SettleResponseWire, SupportedKind, SupportedKinds, DEFAULT_FACILITATOR_TIMEOUT,
};
pub use network::{NetworkConfig, NetworkFamily, NetworkId};
pub use payment::{
    PaymentPayload, PaymentRequiredResponse, PaymentRequirement, ProtocolVersion,
    ResourceDescriptor,
};
pub use token::{AssetId, TokenInfo, TokenRegistry};
