//! Mock gateway for testing and local development
//!
//! Records every call and answers with configurable outcomes. Charges succeed with
//! status `PAID` and a transaction key derived from the payment id unless told otherwise.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{BillingKeyCharge, GatewayPayment, PaymentGateway};
use crate::error::{Error, Result};

/// A call received by [`MockGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Charge {
        payment_id: String,
        charge: BillingKeyCharge,
    },
    Cancel {
        transaction_key: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
struct Rejection {
    status: u16,
    body: serde_json::Value,
}

impl Rejection {
    fn into_error(self, fallback: &str) -> Error {
        Error::Gateway {
            status: self.status,
            message: super::error_message(&self.body, fallback),
            details: self.body,
        }
    }
}

#[derive(Debug)]
struct MockState {
    calls: Vec<GatewayCall>,
    charge_status: Option<String>,
    omit_transaction_key: bool,
    charge_rejection: Option<Rejection>,
    cancel_rejection: Option<Rejection>,
}

/// In-process [`PaymentGateway`] fake
#[derive(Debug)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                calls: Vec::new(),
                charge_status: Some("PAID".to_string()),
                omit_transaction_key: false,
                charge_rejection: None,
                cancel_rejection: None,
            }),
        }
    }

    /// Report `status` for accepted charges (e.g. `PENDING`)
    pub fn with_charge_status(self, status: &str) -> Self {
        self.lock().charge_status = Some(status.to_string());
        self
    }

    /// Leave the transaction key out of charge responses
    pub fn without_transaction_key(self) -> Self {
        self.lock().omit_transaction_key = true;
        self
    }

    /// Reject every charge with `status` and `body`
    pub fn rejecting_charges(self, status: u16, body: serde_json::Value) -> Self {
        self.lock().charge_rejection = Some(Rejection { status, body });
        self
    }

    /// Reject every cancellation with `status` and `body`
    pub fn rejecting_cancels(self, status: u16, body: serde_json::Value) -> Self {
        self.lock().cancel_rejection = Some(Rejection { status, body });
        self
    }

    /// All calls received so far, oldest first
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn charge_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::Charge { .. }))
            .count()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, GatewayCall::Cancel { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not poison every later assertion
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge_billing_key(
        &self,
        payment_id: &str,
        charge: &BillingKeyCharge,
    ) -> Result<GatewayPayment> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::Charge {
            payment_id: payment_id.to_string(),
            charge: charge.clone(),
        });

        if let Some(rejection) = state.charge_rejection.clone() {
            return Err(rejection.into_error("Payment processing failed"));
        }

        Ok(GatewayPayment {
            id: if state.omit_transaction_key {
                None
            } else {
                Some(format!("tx-{}", payment_id))
            },
            status: state.charge_status.clone(),
        })
    }

    async fn cancel_payment(
        &self,
        transaction_key: &str,
        reason: &str,
    ) -> Result<serde_json::Value> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::Cancel {
            transaction_key: transaction_key.to_string(),
            reason: reason.to_string(),
        });

        if let Some(rejection) = state.cancel_rejection.clone() {
            return Err(rejection.into_error("Payment cancellation failed"));
        }

        Ok(serde_json::json!({
            "cancellation": { "status": "SUCCEEDED", "transactionKey": transaction_key }
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
