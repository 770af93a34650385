//! Billing: charge and cancellation initiators
//!
//! Both operations follow the same order: validate, authorize against the
//! server-verified principal, call the gateway, then append to the ledger. The
//! gateway call is the irreversible effect, so a ledger failure after it is
//! logged and the operation still reports success.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::Principal;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::gateway::{BillingKeyCharge, PaymentGateway};
use crate::models::{LedgerEntry, LedgerStatus, NewLedgerEntry};

/// Length of one paid period
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// Extra access granted after the period ends
pub const GRACE_PERIOD_DAYS: i64 = 1;

/// How long an idempotency key replays an earlier charge
pub const IDEMPOTENCY_WINDOW_MINUTES: i64 = 10;

/// Renewal attempts are spread over this UTC hour
pub const RENEWAL_HOUR_UTC: u32 = 10;

/// Reason sent to the gateway when the user gave none
pub const DEFAULT_CANCEL_REASON: &str = "No reason provided";

const REFERENCE_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const REFERENCE_SUFFIX_LEN: usize = 7;

/// A subscription charge as requested by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChargeRequest {
    pub billing_key: String,
    pub order_name: String,
    /// Minor currency units
    pub amount: i64,
    /// `customer.id` on the wire
    pub customer_id: String,
    /// The user the charge is attributed to (`customData` on the wire)
    pub subscriber_id: String,
    pub idempotency_key: Option<String>,
}

/// Outcome of a charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeReceipt {
    /// Local payment reference; for a replay, the recorded transaction key
    pub payment_id: String,
    /// Key the ledger row was (or would have been) written under
    pub transaction_key: String,
    /// Gateway status, `PAID` or a pending value; for a replay, the status recorded
    /// with the original charge
    pub status: Option<String>,
    /// True when an earlier charge with the same idempotency key was returned
    pub replayed: bool,
    /// False when the ledger append after the gateway call failed
    #[serde(skip)]
    pub recorded: bool,
}

/// A cancellation as requested by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelRequest {
    pub transaction_key: String,
    pub reason: Option<String>,
}

/// Outcome of a cancellation
#[derive(Debug, Clone, PartialEq)]
pub struct CancelReceipt {
    pub transaction_key: String,
    /// The charge that was cancelled
    pub cancelled: LedgerEntry,
    /// Gateway confirmation body
    pub gateway_response: serde_json::Value,
    /// False when the ledger append after the gateway call failed
    pub recorded: bool,
}

/// Validity window of one paid period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub end_grace_at: DateTime<Utc>,
    pub next_schedule_at: DateTime<Utc>,
}

impl BillingWindow {
    /// Window for a period starting at `now`, renewing at `10:{minute}` UTC the
    /// day after the period ends
    pub fn starting_at(now: DateTime<Utc>, minute: u32) -> Self {
        let end_at = now + Duration::days(SUBSCRIPTION_PERIOD_DAYS);
        let end_grace_at = end_at + Duration::days(GRACE_PERIOD_DAYS);
        let renewal_day = end_at + Duration::days(1);
        let next_schedule_at = renewal_day
            .date_naive()
            .and_hms_opt(RENEWAL_HOUR_UTC, minute % 60, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(renewal_day);

        Self {
            start_at: now,
            end_at,
            end_grace_at,
            next_schedule_at,
        }
    }
}

/// Generate a local payment reference: `payment_<unix-millis>_<7 base36 chars>`
pub fn generate_payment_reference(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REFERENCE_CHARSET.len());
            REFERENCE_CHARSET[idx] as char
        })
        .collect();
    format!("payment_{}_{}", now.timestamp_millis(), suffix)
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Charge and cancellation service
///
/// Construct once at startup with the store and the configured gateway. A
/// missing gateway only fails the operations that need it.
#[derive(Clone)]
pub struct Billing {
    db: Database,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl Billing {
    pub fn new(db: Database, gateway: Option<Arc<dyn PaymentGateway>>) -> Self {
        Self { db, gateway }
    }

    fn gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.gateway
            .as_ref()
            .ok_or_else(|| Error::Configuration("Payment gateway is not configured".into()))
    }

    /// Charge the caller's billing key for one subscription period
    pub async fn charge(
        &self,
        caller: Option<&Principal>,
        request: ChargeRequest,
    ) -> Result<ChargeReceipt> {
        require(&request.billing_key, "billingKey")?;
        require(&request.order_name, "orderName")?;
        require(&request.subscriber_id, "customData")?;
        require(&request.customer_id, "customer.id")?;
        if request.amount <= 0 {
            return Err(Error::Validation("amount must be positive".into()));
        }

        let caller = caller.ok_or_else(|| Error::Unauthenticated("Sign in to subscribe".into()))?;
        if caller.id != request.subscriber_id || caller.id != request.customer_id {
            warn!(
                user_id = %caller.id,
                subscriber_id = %request.subscriber_id,
                customer_id = %request.customer_id,
                "Charge attributed to a different user"
            );
            return Err(Error::Forbidden(
                "Charge must be made for the signed-in user".into(),
            ));
        }

        let idempotency_key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let now = Utc::now();
        if let Some(key) = &idempotency_key {
            let since = now - Duration::minutes(IDEMPOTENCY_WINDOW_MINUTES);
            if let Some(prior) = self.db.find_charge_by_idempotency_key(&caller.id, key, since)? {
                info!(
                    user_id = %caller.id,
                    transaction_key = %prior.transaction_key,
                    "Replaying charge for repeated idempotency key"
                );
                return Ok(ChargeReceipt {
                    payment_id: prior.transaction_key.clone(),
                    transaction_key: prior.transaction_key,
                    status: prior.gateway_status,
                    replayed: true,
                    recorded: true,
                });
            }
        }

        let gateway = self.gateway()?;
        let payment_id = generate_payment_reference(now);
        debug!(user_id = %caller.id, payment_id = %payment_id, gateway = gateway.name(), "Charging billing key");

        let payment = gateway
            .charge_billing_key(
                &payment_id,
                &BillingKeyCharge {
                    billing_key: request.billing_key,
                    order_name: request.order_name,
                    customer_id: request.customer_id,
                    amount: request.amount,
                    custom_data: request.subscriber_id,
                },
            )
            .await?;

        if !payment.is_paid() {
            info!(
                payment_id = %payment_id,
                status = payment.status.as_deref().unwrap_or("unknown"),
                "Charge accepted but not settled yet"
            );
        }

        let transaction_key = payment.id.clone().unwrap_or_else(|| payment_id.clone());
        let minute = rand::thread_rng().gen_range(0..60);
        let window = BillingWindow::starting_at(now, minute);

        let entry = NewLedgerEntry {
            user_id: caller.id.clone(),
            transaction_key: transaction_key.clone(),
            amount: request.amount,
            status: LedgerStatus::Paid,
            start_at: window.start_at,
            end_at: window.end_at,
            end_grace_at: window.end_grace_at,
            next_schedule_at: window.next_schedule_at,
            next_schedule_id: uuid::Uuid::new_v4().to_string(),
            idempotency_key,
            gateway_status: payment.status.clone(),
        };

        let recorded = match self.db.append_ledger_entry(&entry) {
            Ok(stored) => {
                info!(
                    user_id = %caller.id,
                    transaction_key = %stored.transaction_key,
                    amount = stored.amount,
                    end_grace_at = %stored.end_grace_at,
                    "Subscription charge recorded"
                );
                true
            }
            Err(e) => {
                error!(
                    user_id = %caller.id,
                    transaction_key = %transaction_key,
                    error = %e,
                    "Charge succeeded at the gateway but the ledger append failed"
                );
                false
            }
        };

        Ok(ChargeReceipt {
            payment_id,
            transaction_key,
            status: payment.status,
            replayed: false,
            recorded,
        })
    }

    /// Cancel one of the caller's subscription lines
    pub async fn cancel(
        &self,
        caller: Option<&Principal>,
        request: CancelRequest,
    ) -> Result<CancelReceipt> {
        require(&request.transaction_key, "transactionKey")?;
        let caller =
            caller.ok_or_else(|| Error::Unauthenticated("Sign in to cancel".into()))?;

        let entries = self
            .db
            .find_transaction_entries(&caller.id, &request.transaction_key)?;
        let paid = match entries.into_iter().next() {
            Some(latest) if latest.status == LedgerStatus::Paid => latest,
            _ => {
                debug!(
                    user_id = %caller.id,
                    transaction_key = %request.transaction_key,
                    "No cancellable charge"
                );
                return Err(Error::NotFound(format!(
                    "No active payment for transaction {}",
                    request.transaction_key
                )));
            }
        };

        let gateway = self.gateway()?;
        let reason = request
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON);

        let gateway_response = gateway
            .cancel_payment(&paid.transaction_key, reason)
            .await?;

        let recorded = match self.db.append_ledger_entry(&NewLedgerEntry::cancellation_of(&paid)) {
            Ok(stored) => {
                info!(
                    user_id = %caller.id,
                    transaction_key = %stored.transaction_key,
                    amount = stored.amount,
                    "Subscription cancellation recorded"
                );
                true
            }
            Err(e) => {
                error!(
                    user_id = %caller.id,
                    transaction_key = %paid.transaction_key,
                    error = %e,
                    "Cancelled at the gateway but the ledger append failed"
                );
                false
            }
        };

        Ok(CancelReceipt {
            transaction_key: paid.transaction_key.clone(),
            cancelled: paid,
            gateway_response,
            recorded,
        })
    }
}
