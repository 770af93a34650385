//! PortOne v2 gateway implementation
//!
//! HTTP client for the two PortOne endpoints billing uses:
//!
//! - `POST /payments/{paymentId}/billing-key`: charge a stored billing key
//! - `POST /payments/{paymentId}/cancel`: cancel an earlier charge
//!
//! Requests authenticate with `Authorization: PortOne <secret>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{error_message, BillingKeyCharge, GatewayPayment, PaymentGateway};
use crate::error::{Error, Result};

/// Default PortOne API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.portone.io";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// PortOne REST client
#[derive(Clone)]
pub struct PortOneGateway {
    http_client: Client,
    base_url: Url,
    api_secret: String,
    currency: String,
}

impl PortOneGateway {
    /// Create a new client
    pub fn new(base_url: &str, api_secret: &str, timeout: Duration) -> Result<Self> {
        if api_secret.trim().is_empty() {
            return Err(Error::Configuration("PortOne API secret is empty".into()));
        }
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            Error::Configuration(format!("Invalid PortOne base URL {}: {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "PortOne base URL cannot carry a path: {}",
                base_url
            )));
        }

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            api_secret: api_secret.to_string(),
            currency: "KRW".to_string(),
        })
    }

    /// Use a different charge currency
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_string();
        self
    }

    /// Create from environment variables
    ///
    /// Returns `Ok(None)` when `PORTONE_API_SECRET` is not set.
    pub fn from_env() -> Result<Option<Self>> {
        let secret = match std::env::var("PORTONE_API_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            Some(secret) => secret,
            None => return Ok(None),
        };
        let base = std::env::var("PORTONE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into());
        let timeout_secs = std::env::var("PORTONE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut gateway = Self::new(&base, &secret, Duration::from_secs(timeout_secs))?;
        if let Ok(currency) = std::env::var("PORTONE_CURRENCY") {
            if !currency.trim().is_empty() {
                gateway = gateway.with_currency(currency.trim());
            }
        }
        Ok(Some(gateway))
    }

    /// Base URL (for logging)
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// `{base}/payments/{payment_id}/{action}` with the id percent-encoded
    fn payment_url(&self, payment_id: &str, action: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("PortOne base URL cannot carry a path".into()))?
            .pop_if_empty()
            .push("payments")
            .push(payment_id)
            .push(action);
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("PortOne {}", self.api_secret)
    }
}

/// Read a response body as JSON, keeping non-JSON bodies as a string for diagnostics
///
/// The status line has already arrived, so the gateway's decision stands even when
/// the body cannot be read; that case is logged and yields `Null`.
async fn read_body(response: Response, reference: &str) -> serde_json::Value {
    let status = response.status().as_u16();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => {
            warn!(reference, status, error = %e, "PortOne response body could not be read");
            return serde_json::Value::Null;
        }
    };
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeBody<'a> {
    billing_key: &'a str,
    order_name: &'a str,
    customer: CustomerBody<'a>,
    amount: AmountBody,
    custom_data: &'a str,
    currency: &'a str,
}

#[derive(Debug, Serialize)]
struct CustomerBody<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct AmountBody {
    total: i64,
}

#[derive(Debug, Serialize)]
struct CancelBody<'a> {
    reason: &'a str,
}

#[async_trait]
impl PaymentGateway for PortOneGateway {
    async fn charge_billing_key(
        &self,
        payment_id: &str,
        charge: &BillingKeyCharge,
    ) -> Result<GatewayPayment> {
        let body = ChargeBody {
            billing_key: &charge.billing_key,
            order_name: &charge.order_name,
            customer: CustomerBody {
                id: &charge.customer_id,
            },
            amount: AmountBody {
                total: charge.amount,
            },
            custom_data: &charge.custom_data,
            currency: &self.currency,
        };

        let response = self
            .http_client
            .post(self.payment_url(payment_id, "billing-key")?)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload = read_body(response, payment_id).await;
        debug!(payment_id, status = status.as_u16(), body = %payload, "PortOne charge response");

        if !status.is_success() {
            warn!(payment_id, status = status.as_u16(), "PortOne rejected billing-key charge");
            return Err(Error::Gateway {
                status: status.as_u16(),
                message: error_message(&payload, "Payment processing failed"),
                details: payload,
            });
        }

        // Some responses nest the payment under a `payment` key
        let payment_value = payload.get("payment").unwrap_or(&payload).clone();
        let payment: GatewayPayment = serde_json::from_value(payment_value).unwrap_or_default();

        info!(
            payment_id,
            transaction_key = payment.id.as_deref().unwrap_or(payment_id),
            status = payment.status.as_deref().unwrap_or("unknown"),
            "PortOne charge accepted"
        );
        Ok(payment)
    }

    async fn cancel_payment(
        &self,
        transaction_key: &str,
        reason: &str,
    ) -> Result<serde_json::Value> {
        let response = self
            .http_client
            .post(self.payment_url(transaction_key, "cancel")?)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .json(&CancelBody { reason })
            .send()
            .await?;

        let status = response.status();
        let payload = read_body(response, transaction_key).await;

        if !status.is_success() {
            warn!(transaction_key, status = status.as_u16(), body = %payload, "PortOne rejected cancellation");
            return Err(Error::Gateway {
                status: status.as_u16(),
                message: error_message(&payload, "Payment cancellation failed"),
                details: payload,
            });
        }

        info!(transaction_key, "PortOne cancellation accepted");
        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "portone"
    }
}
