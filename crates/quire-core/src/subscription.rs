//! Subscription state evaluation
//!
//! Reduces a user's payment ledger to "is there an active subscription right now".
//! Every caller (status display, content gate, CLI) goes through [`evaluate`] so the
//! grouping and window rules live in exactly one place.
//!
//! Rules:
//! - entries are grouped by transaction key, and only the newest entry of each group
//!   (by `created_at`) counts
//! - a group is active when its newest entry is `Paid` and `start_at <= now <= end_grace_at`
//! - groups never influence each other
//!
//! Entries with identical `created_at` inside one group keep whichever appeared first
//! in the input. The store returns rows newest first with `id` as the tie-breaker, so
//! in practice the later insertion wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{LedgerEntry, LedgerStatus};

/// Result of evaluating a ledger at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_key: Option<String>,
}

impl SubscriptionState {
    pub fn inactive() -> Self {
        Self {
            active: false,
            transaction_key: None,
        }
    }

    /// Short label shown next to the user's profile
    pub fn label(&self) -> &'static str {
        if self.active {
            "Subscribed"
        } else {
            "Free"
        }
    }
}

/// Newest entry per transaction key, in first-seen key order
pub fn latest_per_transaction(entries: &[LedgerEntry]) -> Vec<&LedgerEntry> {
    let mut latest: Vec<&LedgerEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        match index.get(entry.transaction_key.as_str()) {
            Some(&slot) => {
                if entry.created_at > latest[slot].created_at {
                    latest[slot] = entry;
                }
            }
            None => {
                index.insert(entry.transaction_key.as_str(), latest.len());
                latest.push(entry);
            }
        }
    }

    latest
}

/// Determine whether the ledger grants access at `now`
///
/// Pure function of its inputs; callers must re-run it on every query since `now`
/// moves and other sessions may have appended entries.
pub fn evaluate(entries: &[LedgerEntry], now: DateTime<Utc>) -> SubscriptionState {
    latest_per_transaction(entries)
        .into_iter()
        .find(|entry| entry.status == LedgerStatus::Paid && entry.covers(now))
        .map(|entry| SubscriptionState {
            active: true,
            transaction_key: Some(entry.transaction_key.clone()),
        })
        .unwrap_or_else(SubscriptionState::inactive)
}
