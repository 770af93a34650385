//! Fixed token table for local development and tests

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use super::{AuthProvider, Principal};
use crate::error::{Error, Result};

/// Environment variable holding `token:user[:email]` pairs, comma separated
pub const DEV_TOKENS_ENV: &str = "QUIRE_DEV_TOKENS";

/// Resolves tokens from an in-memory table
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuth {
    entries: Vec<(String, Principal)>,
}

impl StaticTokenAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token that resolves to `principal`
    pub fn with_token(mut self, token: &str, principal: Principal) -> Self {
        self.entries.push((token.to_string(), principal));
        self
    }

    /// Parse a `token:user[:email],...` table
    pub fn parse(spec: &str) -> Result<Self> {
        let mut auth = Self::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let mut parts = pair.splitn(3, ':').map(str::trim);
            let token = parts.next().unwrap_or_default();
            let user = parts.next().unwrap_or_default();
            if token.is_empty() || user.is_empty() {
                return Err(Error::Configuration(format!(
                    "Invalid {} entry (expected token:user[:email]): {}",
                    DEV_TOKENS_ENV, pair
                )));
            }
            let mut principal = Principal::new(user);
            if let Some(email) = parts.next().filter(|e| !e.is_empty()) {
                principal = principal.with_email(email);
            }
            auth = auth.with_token(token, principal);
        }
        Ok(auth)
    }

    /// Create from `QUIRE_DEV_TOKENS`; `Ok(None)` when unset or empty
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(DEV_TOKENS_ENV) {
            Ok(spec) if !spec.trim().is_empty() => Self::parse(&spec).map(Some),
            _ => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn resolve_token(&self, token: &str) -> Result<Option<Principal>> {
        if token.is_empty() {
            return Ok(None);
        }
        // Scan every entry so timing does not reveal which one matched
        let mut found = None;
        for (candidate, principal) in &self.entries {
            if bool::from(candidate.as_bytes().ct_eq(token.as_bytes())) && found.is_none() {
                found = Some(principal.clone());
            }
        }
        Ok(found)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
