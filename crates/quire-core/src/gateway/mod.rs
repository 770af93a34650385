//! Payment gateway abstraction
//!
//! The gateway is the source of truth for money movement; Quire only asks it to
//! charge a stored billing key or cancel an earlier charge, and trusts the answer.
//!
//! # Architecture
//!
//! - `PaymentGateway` trait: the two operations billing needs
//! - `PortOneGateway`: HTTP client for the PortOne v2 REST API
//! - `MockGateway`: in-process fake that records calls
//!
//! # Configuration
//!
//! Environment variables:
//! - `PORTONE_API_SECRET`: API secret (required; the gateway is disabled without it)
//! - `PORTONE_API_BASE`: API base URL (default: https://api.portone.io)
//! - `PORTONE_TIMEOUT_SECS`: Request timeout (default: 30)
//! - `PORTONE_CURRENCY`: Charge currency (default: KRW)
//!
//! Calls are never retried automatically: without an idempotency key negotiated
//! with the provider a retry can charge twice.

mod mock;
mod portone;

pub use mock::{GatewayCall, MockGateway};
pub use portone::PortOneGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A billing-key charge as sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingKeyCharge {
    pub billing_key: String,
    pub order_name: String,
    pub customer_id: String,
    /// Minor currency units
    pub amount: i64,
    /// Opaque value echoed back by the provider (the subscriber's user id)
    pub custom_data: String,
}

/// What the gateway reported for an accepted charge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    /// Gateway transaction key; some responses omit it
    #[serde(default)]
    pub id: Option<String>,
    /// `PAID`, or a pending value that settles asynchronously
    #[serde(default)]
    pub status: Option<String>,
}

impl GatewayPayment {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("PAID")
    }
}

/// Trait implemented by payment providers
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge a stored billing key under the caller-chosen `payment_id`
    async fn charge_billing_key(
        &self,
        payment_id: &str,
        charge: &BillingKeyCharge,
    ) -> Result<GatewayPayment>;

    /// Cancel an earlier charge, returning the provider's confirmation body
    async fn cancel_payment(
        &self,
        transaction_key: &str,
        reason: &str,
    ) -> Result<serde_json::Value>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Pull a human-readable message out of a provider error body
pub(crate) fn error_message(body: &serde_json::Value, fallback: &str) -> String {
    body.get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}
