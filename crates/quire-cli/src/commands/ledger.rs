//! Ledger commands: subscription status, ledger listing and due renewals

use anyhow::{Context, Result};
use chrono::Utc;
use quire_core::db::Database;
use quire_core::models::LedgerStatus;

use super::truncate;

/// Amount in minor units with thousands separators
fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn cmd_status(db: &Database, user_id: &str) -> Result<()> {
    let now = Utc::now();
    let state = db
        .subscription_state(user_id, now)
        .context("Failed to evaluate subscription")?;

    println!();
    println!("📰 Subscription for {}", user_id);
    println!("   ─────────────────────────────────────────────────────────────");

    if state.active {
        println!("   ✅ {}", state.label());
        if let Some(key) = &state.transaction_key {
            println!("   Transaction: {}", key);
            if let Some(entry) = db
                .list_ledger_entries(user_id)?
                .into_iter()
                .find(|e| &e.transaction_key == key)
            {
                println!("   Period ends: {}", entry.end_at.format("%Y-%m-%d %H:%M UTC"));
                println!("   Access until: {}", entry.end_grace_at.format("%Y-%m-%d %H:%M UTC"));
                println!(
                    "   Next renewal: {}",
                    entry.next_schedule_at.format("%Y-%m-%d %H:%M UTC")
                );
            }
        }
    } else {
        println!("   ⚪ {}", state.label());
    }
    println!();

    Ok(())
}

pub fn cmd_ledger(db: &Database, user_id: &str, json: bool) -> Result<()> {
    let entries = db
        .list_ledger_entries(user_id)
        .context("Failed to read ledger")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No ledger entries for {}", user_id);
        return Ok(());
    }

    println!();
    println!(
        "   {:<20} {:<7} {:>10}  {:<16} {:<16}",
        "Recorded", "Status", "Amount", "Start", "Access until"
    );
    println!("   {}", "─".repeat(76));
    for entry in &entries {
        let marker = match entry.status {
            LedgerStatus::Paid => "💳",
            LedgerStatus::Cancel => "↩️ ",
        };
        println!(
            "{} {:<20} {:<7} {:>10}  {:<16} {:<16}",
            marker,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.status.as_str(),
            format_amount(entry.amount),
            entry.start_at.format("%Y-%m-%d %H:%M"),
            entry.end_grace_at.format("%Y-%m-%d %H:%M"),
        );
        println!("     {}", truncate(&entry.transaction_key, 60));
    }
    println!();
    println!("   {} entries", entries.len());

    Ok(())
}

pub fn cmd_renewals(db: &Database) -> Result<()> {
    let now = Utc::now();
    let due = db
        .list_due_renewals(now)
        .context("Failed to list due renewals")?;

    if due.is_empty() {
        println!("✅ No renewals due");
        return Ok(());
    }

    println!("🔁 {} renewal(s) due", due.len());
    for entry in &due {
        println!(
            "   {}  {:<24} {:>10}  schedule {}  ({})",
            entry.next_schedule_at.format("%Y-%m-%d %H:%M"),
            truncate(&entry.user_id, 24),
            format_amount(entry.amount),
            entry.next_schedule_id,
            truncate(&entry.transaction_key, 40),
        );
    }

    Ok(())
}
