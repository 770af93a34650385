//! Quire Core Library
//!
//! Shared functionality for the Quire magazine subscription service:
//! - Database access and migrations (append-only payment ledger, magazines, audit log)
//! - Subscription evaluation over the ledger
//! - Billing: charge and cancellation initiators
//! - Pluggable payment gateways (PortOne, mock)
//! - Pluggable auth providers (Supabase, static tokens)

pub mod auth;
pub mod billing;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod subscription;

/// Test utilities including mock PortOne and Supabase servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use auth::{AuthProvider, Principal, StaticTokenAuth, SupabaseAuth, UserProfile};
pub use billing::{Billing, CancelReceipt, CancelRequest, ChargeReceipt, ChargeRequest};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use gateway::{BillingKeyCharge, GatewayPayment, MockGateway, PaymentGateway, PortOneGateway};
pub use models::{LedgerEntry, LedgerStatus, Magazine, MagazineSummary, NewLedgerEntry, NewMagazine};
pub use subscription::SubscriptionState;
