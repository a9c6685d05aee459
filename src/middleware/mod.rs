//! Axum middleware for the payment gateway
//!
//! This is the seam between the gateway core and the web framework: the
//! route binding supplies a [`RouteConfig`] (path, description, price,
//! per-network configuration), and the middleware returns either a 402
//! with payment requirements, an error response, or the protected
//! handler's response with settlement evidence attached.
//!
//! # Payment flow
//!
//! 1. Request arrives without `X-PAYMENT` → 402 with requirements
//! 2. Request arrives with `X-PAYMENT` → decode, route, settle
//! 3. Settlement succeeds → handler runs with a `PaymentContext`
//!    extension, response carries `X-PAYMENT-RESPONSE`
//! 4. Settlement fails → 402 with the facilitator's reason and fresh
//!    requirements
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use x402_gateway::middleware::{payment_gateway_middleware, PaymentGateway, RouteConfig};
//! use x402_gateway::types::{NetworkConfig, NetworkId, TokenRegistry};
//!
//! # fn example() -> x402_gateway::Result<()> {
//! let route = RouteConfig::new(1000)
//!     .with_description("Premium API access")
//!     .with_network(
//!         NetworkConfig::new(
//!             NetworkId::stacks_testnet(),
//!             "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG",
//!             "https://facilitator.example.com",
//!         )
//!         .with_accepted_tokens(vec!["STX".to_string()]),
//!     );
//!
//! let gateway = PaymentGateway::new(route, TokenRegistry::with_defaults())?;
//!
//! let app: Router = Router::new()
//!     .route("/premium", get(|| async { "paid content" }))
//!     .layer(axum::middleware::from_fn_with_state(
//!         gateway,
//!         payment_gateway_middleware,
//!     ));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod payment;


// Re-export commonly used types
pub use config::{GatewayConfig, RouteConfig};
pub use payment::{payment_gateway_middleware, PaymentDecision, PaymentGateway};
