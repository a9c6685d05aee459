//! # x402 Payment Gateway
//!
//! A **type-safe** Rust gateway for the x402 HTTP-native micropayment protocol:
//! protect any Axum route with pay-per-request settlement.
//!
//! ## Features
//!
//! - 🚀 **HTTP-native micropayments**: Leverage the HTTP 402 status code for payment requirements
//! - ⛓️ **Multi-network**: Namespaced network ids (`stacks:mainnet`, `eip155:8453`) routed per family
//! - 🌐 **Axum middleware**: Drop-in `from_fn_with_state` layer around existing handlers
//! - 💰 **Facilitator integration**: Settlement delegated to an external facilitator service
//! - 🔁 **Replay deduplication**: Identical proofs settle once, concurrent replays single-flight
//! - 🪙 **Token registry**: Native units and contract-addressed fungible tokens per network
//! - 🧾 **Two wire generations**: Structured v2 payloads plus the legacy v1 flat layout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{middleware::from_fn_with_state, response::Json, routing::get, Router};
//! use tower_http::trace::TraceLayer;
//! use x402_gateway::{
//!     middleware::{payment_gateway_middleware, PaymentGateway, RouteConfig},
//!     types::{NetworkConfig, NetworkId, TokenRegistry},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tracing_subscriber::fmt::init();
//!
//!     let route = RouteConfig::new(1000)
//!         .with_description("Premium API access")
//!         .with_network(
//!             NetworkConfig::new(
//!                 NetworkId::stacks_testnet(),
//!                 "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
//!                 "https://facilitator.example.com",
//!             )
//!             .with_accepted_tokens(vec!["STX".to_string()]),
//!         );
//!     let gateway = PaymentGateway::new(route, TokenRegistry::with_defaults())?;
//!
//!     let app: Router = Router::new()
//!         .route("/premium", get(premium_handler))
//!         .layer(from_fn_with_state(gateway, payment_gateway_middleware))
//!         .layer(TraceLayer::new_for_http());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4021").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//!
//! async fn premium_handler() -> Json<serde_json::Value> {
//!     Json(serde_json::json!({ "data": "worth paying for" }))
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`types`**: Networks, tokens, payment requirements and wire payloads
//! - **`codec`**: Payment header decoding and proof digests
//! - **`router`**: Per-network-family capability dispatch
//! - **`facilitator`**: Settlement client with replay deduplication
//! - **`context`**: Verified payment context injected into handlers
//! - **`middleware`**: Axum middleware and route configuration
//! - **`error`**: Error taxonomy mapped onto HTTP statuses

pub mod codec;
pub mod context;
pub mod error;
pub mod facilitator;
pub mod middleware;
pub mod router;
pub mod types;

// Re-exports for convenience
pub use context::PaymentContext;
pub use error::{GatewayError, Result};
pub use facilitator::FacilitatorClient;
pub use middleware::{payment_gateway_middleware, GatewayConfig, PaymentGateway, RouteConfig};
pub use router::{NetworkCapability, NetworkRouter};
pub use types::*;

/// Current version of the gateway library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
