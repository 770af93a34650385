//! Audit log command

use anyhow::{Context, Result};
use quire_core::db::Database;

use super::truncate;

pub fn cmd_audit(db: &Database, limit: i64) -> Result<()> {
    let entries = db
        .list_audit_log(limit.max(1))
        .context("Failed to read audit log")?;

    if entries.is_empty() {
        println!("Audit log is empty");
        return Ok(());
    }

    for entry in &entries {
        let target = match (&entry.entity_type, &entry.entity_id) {
            (Some(kind), Some(id)) => format!("{} {}", kind, id),
            (Some(kind), None) => kind.clone(),
            _ => String::new(),
        };
        println!(
            "{}  {:<20} {:<8} {:<30} {}",
            entry.timestamp,
            truncate(&entry.user_id, 20),
            entry.action,
            truncate(&target, 30),
            entry.details.as_deref().unwrap_or(""),
        );
    }

    Ok(())
}
