//! Subscription status handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Serialize;

use crate::{AppError, AppState, Caller};

/// Response for GET /api/subscription
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub is_subscribed: bool,
    /// "Subscribed" or "Free"
    pub status_message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_key: Option<String>,
}

/// GET /api/subscription - Evaluate the caller's subscription now
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let principal = caller.require()?;

    let subscription = state.db.subscription_state(&principal.id, Utc::now())?;

    // Audit log - read access
    state.db.log_audit(
        &principal.id,
        "view",
        Some("subscription"),
        subscription.transaction_key.as_deref(),
        Some(&format!("active={}", subscription.active)),
    )?;

    Ok(Json(SubscriptionResponse {
        is_subscribed: subscription.active,
        status_message: subscription.label(),
        transaction_key: subscription.transaction_key,
    }))
}
