//! Payment ledger operations
//!
//! Rows are only ever inserted. Reads return newest first, ordered by `created_at`
//! and then by `id` so rows stamped in the same microsecond still come back in
//! insertion order (latest first).

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{datetime_column, format_datetime, Database};
use crate::error::Result;
use crate::models::{LedgerEntry, LedgerStatus, NewLedgerEntry};
use crate::subscription::{self, SubscriptionState};

const LEDGER_COLUMNS: &str = "id, user_id, transaction_key, amount, status, start_at, end_at, \
     end_grace_at, next_schedule_at, next_schedule_id, idempotency_key, gateway_status, created_at";

fn map_ledger_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let status_str: String = row.get(4)?;
    let status = LedgerStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown ledger status: {}", status_str).into(),
        )
    })?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        transaction_key: row.get(2)?,
        amount: row.get(3)?,
        status,
        start_at: datetime_column(row, 5)?,
        end_at: datetime_column(row, 6)?,
        end_grace_at: datetime_column(row, 7)?,
        next_schedule_at: datetime_column(row, 8)?,
        next_schedule_id: row.get(9)?,
        idempotency_key: row.get(10)?,
        gateway_status: row.get(11)?,
        created_at: datetime_column(row, 12)?,
    })
}

impl Database {
    /// Append one ledger row; the store assigns `id` and `created_at`
    pub fn append_ledger_entry(&self, entry: &NewLedgerEntry) -> Result<LedgerEntry> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        conn.execute(
            r#"
            INSERT INTO payment (user_id, transaction_key, amount, status, start_at, end_at,
                                 end_grace_at, next_schedule_at, next_schedule_id,
                                 idempotency_key, gateway_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.user_id,
                entry.transaction_key,
                entry.amount,
                entry.status.as_str(),
                format_datetime(&entry.start_at),
                format_datetime(&entry.end_at),
                format_datetime(&entry.end_grace_at),
                format_datetime(&entry.next_schedule_at),
                entry.next_schedule_id,
                entry.idempotency_key,
                entry.gateway_status,
                format_datetime(&created_at),
            ],
        )?;

        let id = conn.last_insert_rowid();
        let stored = conn.query_row(
            &format!("SELECT {} FROM payment WHERE id = ?", LEDGER_COLUMNS),
            params![id],
            map_ledger_row,
        )?;

        Ok(stored)
    }

    /// All ledger rows for a user, newest first
    pub fn list_ledger_entries(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payment WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            LEDGER_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![user_id], map_ledger_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Rows for one subscription line of one user, newest first
    pub fn find_transaction_entries(
        &self,
        user_id: &str,
        transaction_key: &str,
    ) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payment WHERE user_id = ? AND transaction_key = ? \
             ORDER BY created_at DESC, id DESC",
            LEDGER_COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![user_id, transaction_key], map_ledger_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Most recent charge carrying `idempotency_key`, if recorded at or after `since`
    pub fn find_charge_by_idempotency_key(
        &self,
        user_id: &str,
        idempotency_key: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payment \
             WHERE user_id = ? AND idempotency_key = ? AND status = 'Paid' AND created_at >= ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            LEDGER_COLUMNS
        ))?;

        let mut rows = stmt.query_map(
            params![user_id, idempotency_key, format_datetime(&since)],
            map_ledger_row,
        )?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Read the user's ledger and evaluate it at `now`
    pub fn subscription_state(&self, user_id: &str, now: DateTime<Utc>) -> Result<SubscriptionState> {
        let entries = self.list_ledger_entries(user_id)?;
        Ok(subscription::evaluate(&entries, now))
    }

    /// Subscription lines whose renewal attempt is due
    ///
    /// Only lines whose newest row is a `Paid` charge qualify; cancelled lines are
    /// never renewed. Ordered by `next_schedule_at`, earliest first.
    pub fn list_due_renewals(&self, now: DateTime<Utc>) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM payment ORDER BY created_at DESC, id DESC",
            LEDGER_COLUMNS
        ))?;

        let entries = stmt
            .query_map([], map_ledger_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Transaction keys are gateway-issued and unique across users
        let mut due: Vec<LedgerEntry> = subscription::latest_per_transaction(&entries)
            .into_iter()
            .filter(|e| e.status == LedgerStatus::Paid && e.next_schedule_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.next_schedule_at);

        Ok(due)
    }
}
