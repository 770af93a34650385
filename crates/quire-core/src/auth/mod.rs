//! Authentication provider abstraction
//!
//! Credential issuance and sessions belong to the external auth provider. Quire only
//! turns an access token into a [`Principal`] and never trusts identity claims that
//! arrive in a request body.
//!
//! - `AuthProvider` trait: resolve an access token to a principal
//! - `SupabaseAuth`: resolves tokens against a Supabase project
//! - `StaticTokenAuth`: fixed token table for local development and tests
//!
//! `resolve_token` returns `Ok(None)` for a credential the provider rejects and `Err`
//! when the provider itself could not be asked. Callers treat both as "not
//! authenticated" for anything that moves money.

mod static_tokens;
mod supabase;

pub use static_tokens::StaticTokenAuth;
pub use supabase::SupabaseAuth;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A server-verified user identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Stable user id; ledger rows are keyed by it
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Provider-specific profile data (`full_name`, `avatar_url`, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Principal {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            email: None,
            created_at: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Trait implemented by authentication providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve an access token to the principal it was issued to
    async fn resolve_token(&self, token: &str) -> Result<Option<Principal>>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Display profile for the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub nickname: String,
    pub email: String,
    pub profile_image: String,
    /// `YYYY.MM` of account creation, empty when unknown
    pub join_date: String,
}

impl UserProfile {
    pub fn from_principal(principal: &Principal) -> Self {
        let email = principal.email.clone().unwrap_or_default();
        let nickname = principal
            .metadata_str("full_name")
            .or_else(|| principal.metadata_str("name"))
            .map(str::to_string)
            .or_else(|| {
                email
                    .split('@')
                    .next()
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Reader".to_string());
        let profile_image = principal
            .metadata_str("avatar_url")
            .or_else(|| principal.metadata_str("picture"))
            .unwrap_or_default()
            .to_string();

        Self {
            id: principal.id.clone(),
            nickname,
            email,
            profile_image,
            join_date: principal
                .created_at
                .map(|dt| dt.format("%Y.%m").to_string())
                .unwrap_or_default(),
        }
    }
}
