//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `audit` - Audit log viewer
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `ledger` - Subscription status, ledger listing and due renewals
//! - `magazines` - Magazine listing and publishing
//! - `serve` - Web server command

pub mod audit;
pub mod core;
pub mod ledger;
pub mod magazines;
pub mod serve;

// Re-export command functions for main.rs
pub use audit::*;
pub use core::*;
pub use ledger::*;
pub use magazines::*;
pub use serve::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
