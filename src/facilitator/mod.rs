//! Facilitator client for payment settlement
//!
//! The facilitator is the trusted external service that verifies a signed
//! payment proof and broadcasts it. The gateway delegates all cryptographic
//! work to it and only interprets the outcome.
//!
//! Two failure classes are kept apart:
//!
//! - transport failure, timeout, non-2xx status or a malformed body is
//!   [`GatewayError::FacilitatorUnavailable`] and may be retried with the
//!   same proof, since settlement has not happened;
//! - a well-formed response with `success=false` is a settled "no" and is
//!   surfaced through the returned [`SettleResponse`]; retrying the same
//!   proof cannot succeed.
//!
//! # Deduplication
//!
//! [`FacilitatorClient::settle`] routes through a single-flight cache
//! keyed by the SHA-256 digest of the proof. Two rapid retries with the
//! same proof produce exactly one HTTP call; the second awaits the first
//! result. Settled outcomes (either way) are cached for a short TTL;
//! transport failures are not, so a retry gets a fresh attempt.
//!
//! # Example
//!
//! ```no_run
//! use x402_gateway::facilitator::FacilitatorClient;
//! use x402_gateway::types::FacilitatorConfig;
//!
//! # async fn example() -> x402_gateway::Result<()> {
//! let config = FacilitatorConfig::new("https://facilitator.example.com");
//! let client = FacilitatorClient::new(config)?;
//! # let payload = todo!();
//! # let requirement = todo!();
//! let settlement = client.settle(&payload, &requirement).await?;
//! if settlement.success {
//!     println!("settled in {}", settlement.transaction);
//! }
//! # Ok(())
//! # }
//! ```

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::codec::{proof_digest, proof_digest_prefix};
use crate::types::{
    FacilitatorConfig, PaymentPayload, PaymentRequirement, SettleRequest, SettleResponse,
    SettleResponseWire, SupportedKinds,
};
use crate::{GatewayError, Result};


/// How long settled outcomes stay in the dedup cache
const DEDUP_TTL: Duration = Duration::from_secs(120);

type CacheSlot = Arc<Mutex<Option<SettleResponse>>>;

/// Single-flight cache over settlement outcomes, keyed by proof digest
///
/// The outer map lock is held only to find or insert a slot; the slot
/// lock is held across the HTTP call so concurrent replays of one proof
/// serialize on it instead of reaching the facilitator twice.
#[derive(Clone, Default)]
struct SettlementCache {
    slots: Arc<Mutex<HashMap<String, (CacheSlot, Instant)>>>,
}

impl SettlementCache {
    async fn slot_for(&self, key: &str) -> CacheSlot {
        let mut slots = self.slots.lock().await;
        slots.retain(|_, (_, inserted)| inserted.elapsed() < DEDUP_TTL);
        slots
            .entry(key.to_string())
            .or_insert_with(|| (Arc::new(Mutex::new(None)), Instant::now()))
            .0
            .clone()
    }

    async fn forget(&self, key: &str) {
        self.slots.lock().await.remove(key);
    }
}

/// Client for the facilitator settlement service
#[derive(Clone)]
pub struct FacilitatorClient {
    url: String,
    client: Client,
    auth_headers: Option<crate::types::AuthHeadersFnArc>,
    cache: SettlementCache,
}

impl std::fmt::Debug for FacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorClient")
            .field("url", &self.url)
            .finish()
    }
}

impl FacilitatorClient {
    /// Create a new facilitator client
    pub fn new(config: FacilitatorConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url,
            client,
            auth_headers: config.create_auth_headers,
            cache: SettlementCache::default(),
        })
    }

    /// The base URL of this facilitator
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Verify and settle a payment, with replay deduplication
    ///
    /// Resubmitting an unchanged proof while its outcome is cached does
    /// not produce a second settlement call.
    pub async fn settle(
        &self,
        payment_payload: &PaymentPayload,
        payment_requirements: &PaymentRequirement,
    ) -> Result<SettleResponse> {
        let key = proof_digest(&payment_payload.proof);
        let slot = self.cache.slot_for(&key).await;
        let mut outcome = slot.lock().await;

        if let Some(cached) = outcome.as_ref() {
            tracing::debug!(
                proof_digest = %proof_digest_prefix(&payment_payload.proof),
                "reusing cached settlement outcome for replayed proof"
            );
            return Ok(cached.clone());
        }

        match self
            .settle_uncached(payment_payload, payment_requirements)
            .await
        {
            Ok(response) => {
                *outcome = Some(response.clone());
                Ok(response)
            }
            Err(e) => {
                // Transport failures are retryable; drop the slot so the
                // next attempt with this proof reaches the facilitator.
                self.cache.forget(&key).await;
                Err(e)
            }
        }
    }

    /// One settlement HTTP call, no caching
    ///
    /// The call runs in a spawned task: if the client disconnects and the
    /// request future is dropped, the in-flight settlement still completes
    /// and its result is discarded, instead of being aborted mid-broadcast.
    async fn settle_uncached(
        &self,
        payment_payload: &PaymentPayload,
        payment_requirements: &PaymentRequirement,
    ) -> Result<SettleResponse> {
        let request_body = SettleRequest {
            x402_version: payment_payload.x402_version,
            payment_payload: payment_payload.clone(),
            payment_requirements: payment_requirements.clone(),
        };

        tracing::debug!(
            facilitator = %self.url,
            network = %payment_requirements.network,
            proof_digest = %proof_digest_prefix(&payment_payload.proof),
            "sending settle request"
        );

        let mut request = self
            .client
            .post(format!("{}/settle", self.url))
            .json(&request_body);

        if let Some(auth_headers) = &self.auth_headers {
            for (key, value) in auth_headers()? {
                request = request.header(key, value);
            }
        }

        let handle = tokio::spawn(async move { request.send().await });
        let response = handle
            .await
            .map_err(|e| GatewayError::facilitator_unavailable(format!("settle task failed: {}", e)))?
            .map_err(GatewayError::from)?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                facilitator = %self.url,
                %status,
                "facilitator settle returned non-success status"
            );
            return Err(GatewayError::facilitator_unavailable(format!(
                "settle failed with status {}",
                status
            )));
        }

        let wire: SettleResponseWire = response.json().await.map_err(|e| {
            GatewayError::facilitator_unavailable(format!("malformed settle response: {}", e))
        })?;
        let settlement: SettleResponse = wire.into();

        if !settlement.success {
            tracing::warn!(
                facilitator = %self.url,
                reason = settlement.error_reason.as_deref().unwrap_or("unspecified"),
                "facilitator rejected payment"
            );
        }
        Ok(settlement)
    }

    /// Query supported payment schemes and networks
    pub async fn supported(&self) -> Result<SupportedKinds> {
        let mut request = self.client.get(format!("{}/supported", self.url));

        if let Some(auth_headers) = &self.auth_headers {
            for (key, value) in auth_headers()? {
                request = request.header(key, value);
            }
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::facilitator_unavailable(format!(
                "supported query failed with status {}",
                response.status()
            )));
        }

        let supported: SupportedKinds = response.json().await.map_err(|e| {
            GatewayError::facilitator_unavailable(format!("malformed supported response: {}", e))
        })?;
        Ok(supported)
    }
}
