//! Supabase auth provider
//!
//! Resolves access tokens with `GET {SUPABASE_URL}/auth/v1/user`, sending the
//! project key as `apikey` and the user's token as a bearer credential.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AuthProvider, Principal};
use crate::error::{Error, Result};

/// Supabase auth client
#[derive(Clone)]
pub struct SupabaseAuth {
    http_client: Client,
    base_url: String,
    api_key: String,
}

/// Subset of the Supabase user object Quire reads
#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl SupabaseAuth {
    /// Create a new client for the project at `base_url`
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if base_url.trim().is_empty() || api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "Supabase URL and key are required".into(),
            ));
        }
        let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Create from environment variables
    ///
    /// Reads `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY`, falling back to
    /// `SUPABASE_ANON_KEY`. Returns `Ok(None)` when either is missing.
    pub fn from_env() -> Result<Option<Self>> {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|s| !s.trim().is_empty());

        let url = match non_empty("SUPABASE_URL") {
            Some(url) => url,
            None => return Ok(None),
        };
        let key = match non_empty("SUPABASE_SERVICE_ROLE_KEY").or_else(|| non_empty("SUPABASE_ANON_KEY")) {
            Some(key) => key,
            None => return Ok(None),
        };

        Self::new(&url, &key).map(Some)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn resolve_token(&self, token: &str) -> Result<Option<Principal>> {
        if token.trim().is_empty() {
            return Ok(None);
        }

        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!(status = response.status().as_u16(), "Supabase rejected access token");
                return Ok(None);
            }
            status if !status.is_success() => {
                warn!(status = status.as_u16(), "Supabase user lookup failed");
            }
            _ => {}
        }

        let user: SupabaseUser = response.error_for_status()?.json().await?;

        Ok(Some(Principal {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            metadata: user.user_metadata,
        }))
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
