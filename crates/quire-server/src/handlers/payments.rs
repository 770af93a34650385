//! Payment handlers: charge, cancel and history

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{audit_after_gateway, AppError, AppState, Caller, SuccessResponse};
use quire_core::{CancelRequest, ChargeRequest, LedgerEntry};

/// `customer` object of a charge request
#[derive(Debug, Default, Deserialize)]
pub struct CustomerRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Request body for POST /api/payments
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePaymentBody {
    pub billing_key: Option<String>,
    pub order_name: Option<String>,
    pub amount: Option<i64>,
    pub customer: Option<CustomerRef>,
    /// User id the charge is attributed to
    pub custom_data: Option<String>,
    pub idempotency_key: Option<String>,
}

impl From<CreatePaymentBody> for ChargeRequest {
    fn from(body: CreatePaymentBody) -> Self {
        Self {
            billing_key: body.billing_key.unwrap_or_default(),
            order_name: body.order_name.unwrap_or_default(),
            amount: body.amount.unwrap_or_default(),
            customer_id: body.customer.and_then(|c| c.id).unwrap_or_default(),
            subscriber_id: body.custom_data.unwrap_or_default(),
            idempotency_key: body.idempotency_key,
        }
    }
}

/// Response for a successful charge
///
/// `paymentId` is the key the charge was recorded under, the same value
/// `POST /api/payments/cancel` accepts as `transactionKey`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_id: String,
    pub transaction_key: String,
    pub status: Option<String>,
    pub replayed: bool,
}

/// POST /api/payments - Charge the caller's billing key
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreatePaymentBody>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, AppError> {
    let Json(body) = payload?;
    let request = ChargeRequest::from(body);
    let amount = request.amount;

    let receipt = state
        .billing
        .charge(caller.principal.as_ref(), request)
        .await?;

    if !receipt.replayed {
        audit_after_gateway(
            &state,
            &caller.audit_id(),
            "charge",
            &receipt.transaction_key,
            &format!(
                "payment_id={}, amount={}, status={}",
                receipt.payment_id,
                amount,
                receipt.status.as_deref().unwrap_or("unknown")
            ),
        );
    }

    Ok(Json(CreatePaymentResponse {
        success: true,
        payment_id: receipt.transaction_key.clone(),
        transaction_key: receipt.transaction_key,
        status: receipt.status,
        replayed: receipt.replayed,
    }))
}

/// Request body for POST /api/payments/cancel
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CancelPaymentBody {
    pub transaction_key: Option<String>,
    pub reason: Option<String>,
}

/// POST /api/payments/cancel - Cancel one of the caller's subscription lines
///
/// Requires a bearer token; the session cookie alone is not accepted.
pub async fn cancel_payment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CancelPaymentBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(body) = payload?;

    let receipt = state
        .billing
        .cancel(
            caller.bearer_principal(),
            CancelRequest {
                transaction_key: body.transaction_key.unwrap_or_default(),
                reason: body.reason,
            },
        )
        .await?;

    audit_after_gateway(
        &state,
        &caller.audit_id(),
        "cancel",
        &receipt.transaction_key,
        &format!("amount={}", -receipt.cancelled.amount),
    );

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/payments/history - The caller's ledger, newest first
pub async fn list_payment_history(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    let principal = caller.require()?;

    let entries = state.db.list_ledger_entries(&principal.id)?;

    // Audit log - read access
    state.db.log_audit(
        &principal.id,
        "list",
        Some("payment"),
        None,
        Some(&format!("count={}", entries.len())),
    )?;

    Ok(Json(entries))
}
