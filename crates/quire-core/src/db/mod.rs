//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `ledger` - Append-only payment ledger (charges and cancellations)
//! - `magazines` - Magazine articles
//! - `audit` - Audit trail of API and CLI actions

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tempfile::TempDir;
use tracing::info;

use crate::error::{Error, Result};

mod audit;
mod ledger;
mod magazines;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "QUIRE_DB_KEY";

/// Stored timestamp layout. Fixed width, so string order equals time order.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Salt for key stretching. Fixed so a passphrase opens the ledger wherever
/// the file is moved; changing it locks out every existing database.
const KEY_SALT: &[u8; 16] = b"quire-salt-v1-fx";

/// Connections per pool
const POOL_SIZE: u32 = 10;

/// Stretch a passphrase into a hex SQLCipher key with Argon2id
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    let encryption = |what: &str, e: &dyn std::fmt::Display| {
        Error::Encryption(format!("{}: {}", what, e))
    };

    let salt = SaltString::encode_b64(KEY_SALT).map_err(|e| encryption("salt", &e))?;
    let hashed = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| encryption("key derivation", &e))?;
    let output = hashed
        .hash
        .ok_or_else(|| Error::Encryption("key derivation produced no output".to_string()))?;

    Ok(hex::encode(output.as_bytes()))
}

/// Format a timestamp for storage
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored timestamp
///
/// Accepts both the fractional layout written by this crate and SQLite's
/// `CURRENT_TIMESTAMP` layout.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.and_utc())
}

/// Read a timestamp column, failing the row instead of guessing on bad data
pub(crate) fn datetime_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

/// Database wrapper with connection pooling
///
/// Construct once at process start and hand clones to whatever needs the store.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    /// Directory owning a throwaway database; removed when the last clone drops
    scratch_dir: Option<Arc<TempDir>>,
}

impl Database {
    /// Open (or create) the encrypted ledger at `path`
    ///
    /// The passphrase is read from `QUIRE_DB_KEY`; without it opening fails.
    /// `new_unencrypted` is the escape hatch for local work and tests.
    pub fn new(path: &str) -> Result<Self> {
        let passphrase = std::env::var(DB_KEY_ENV).map_err(|_| {
            Error::Encryption(format!(
                "{} is not set. Export a passphrase to open the encrypted ledger, \
                 or pass --no-encrypt for a plain-text development database.",
                DB_KEY_ENV
            ))
        })?;
        Self::new_with_key(path, Some(&passphrase))
    }

    /// Open without SQLCipher. Ledger rows are readable by anyone with the file.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open with an explicit passphrase (`None` = unencrypted)
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let builder = Pool::builder().max_size(POOL_SIZE);

        let pool = match passphrase {
            Some(pass) => {
                let pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
                builder.build(manager.with_init(move |conn| conn.execute_batch(&pragma)))?
            }
            None => builder.build(manager)?,
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            scratch_dir: None,
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Throwaway database for tests
    ///
    /// Backed by a file in a fresh temp directory: pooled `:memory:` connections
    /// would each see a separate empty database. The directory, WAL files included,
    /// is deleted once the last clone is dropped.
    pub fn in_memory() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("quire-test-").tempdir()?;
        let path = dir.path().join("quire.db").to_string_lossy().into_owned();

        let mut db = Self::new_unencrypted(&path)?;
        db.scratch_dir = Some(Arc::new(dir));
        Ok(db)
    }

    /// Whether SQLCipher is active and a passphrase is configured
    pub fn is_encrypted(&self) -> Result<bool> {
        let cipher: rusqlite::Result<String> =
            self.conn()?
                .query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(cipher.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Pooled connection
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create tables, indexes and the append-only triggers
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block the ledger writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Payment ledger (append-only)
            CREATE TABLE IF NOT EXISTS payment (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                transaction_key TEXT NOT NULL,
                amount INTEGER NOT NULL,                   -- minor units, negative for Cancel
                status TEXT NOT NULL CHECK (status IN ('Paid', 'Cancel')),
                start_at TEXT NOT NULL,
                end_at TEXT NOT NULL,
                end_grace_at TEXT NOT NULL,
                next_schedule_at TEXT NOT NULL,
                next_schedule_id TEXT NOT NULL,
                idempotency_key TEXT,                      -- client-supplied, charges only
                gateway_status TEXT,                       -- gateway-reported status, charges only
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_payment_user_created ON payment(user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_payment_user_key ON payment(user_id, transaction_key);
            CREATE INDEX IF NOT EXISTS idx_payment_idempotency ON payment(user_id, idempotency_key);

            CREATE TRIGGER IF NOT EXISTS payment_no_update
            BEFORE UPDATE ON payment
            BEGIN
                SELECT RAISE(ABORT, 'payment ledger is append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS payment_no_delete
            BEFORE DELETE ON payment
            BEGIN
                SELECT RAISE(ABORT, 'payment ledger is append-only');
            END;

            -- Magazine articles
            CREATE TABLE IF NOT EXISTS magazines (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',           -- JSON array of strings
                image_url TEXT,
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_magazines_category ON magazines(category);
            CREATE INDEX IF NOT EXISTS idx_magazines_created ON magazines(created_at);

            -- Audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id TEXT,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_user ON audit_log(user_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

/// Audit log entry
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub details: Option<String>,
}
