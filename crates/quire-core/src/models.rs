//! Data models for Quire

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    /// A successful charge for one subscription period
    Paid,
    /// Offsetting record for an earlier charge on the same transaction key
    Cancel,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Cancel => "Cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Paid" => Some(Self::Paid),
            "Cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable payment or cancellation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub transaction_key: String,
    /// Minor currency units; negative for cancellations
    pub amount: i64,
    pub status: LedgerStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub end_grace_at: DateTime<Utc>,
    pub next_schedule_at: DateTime<Utc>,
    pub next_schedule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Status the gateway reported for the charge (`PAID` or a pending value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether `now` falls inside `[start_at, end_grace_at]`
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now && now <= self.end_grace_at
    }
}

/// A ledger row before the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub transaction_key: String,
    pub amount: i64,
    pub status: LedgerStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub end_grace_at: DateTime<Utc>,
    pub next_schedule_at: DateTime<Utc>,
    pub next_schedule_id: String,
    pub idempotency_key: Option<String>,
    pub gateway_status: Option<String>,
}

impl NewLedgerEntry {
    /// The cancellation counterpart of a stored charge: same line and window, negated amount
    pub fn cancellation_of(charge: &LedgerEntry) -> Self {
        Self {
            user_id: charge.user_id.clone(),
            transaction_key: charge.transaction_key.clone(),
            amount: -charge.amount,
            status: LedgerStatus::Cancel,
            start_at: charge.start_at,
            end_at: charge.end_at,
            end_grace_at: charge.end_grace_at,
            next_schedule_at: charge.next_schedule_at,
            next_schedule_id: charge.next_schedule_id.clone(),
            idempotency_key: None,
            gateway_status: None,
        }
    }
}

/// A magazine article
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Magazine {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing view of a magazine (no body content)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagazineSummary {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a magazine
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMagazine {
    pub category: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}
