//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod magazines;
pub mod payments;
pub mod subscription;

// Re-export all handlers for use in router
pub use auth::*;
pub use magazines::*;
pub use payments::*;
pub use subscription::*;
