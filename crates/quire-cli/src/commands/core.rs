//! Opening the ledger database and `quire init`

use std::path::Path;

use anyhow::{Context, Result};
use quire_core::db::Database;

/// Open the ledger; SQLCipher unless `--no-encrypt` was given
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path = db_path
        .to_str()
        .with_context(|| format!("Database path is not UTF-8: {}", db_path.display()))?;

    let opened = if no_encrypt {
        Database::new_unencrypted(path)
    } else {
        Database::new(path)
    };
    opened.with_context(|| format!("Cannot open ledger database {}", db_path.display()))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    println!("📚 Ledger database ready at {}", db_path.display());
    println!("   Tables: payment (append-only), magazines, audit_log");
    match (no_encrypt, db.is_encrypted().unwrap_or(false)) {
        (true, _) => println!("   ⚠️  Plain-text database (--no-encrypt)"),
        (false, true) => println!("   🔒 SQLCipher encryption active"),
        (false, false) => {}
    }

    println!();
    println!("Try next:");
    println!("  quire magazines add --category culture --title \"...\" --content-file post.md");
    println!("  quire serve");

    Ok(())
}
