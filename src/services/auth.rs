//! Connection authentication: credential in, identity out.
//!
//! ARCHITECTURE
//! ============
//! Token issuance lives elsewhere; this service only verifies. Production
//! uses `SessionVerifier`, a lookup against the `sessions` table with expiry
//! enforced in SQL. `StaticTokenVerifier` serves tests and local runs.
//!
//! TRADE-OFFS
//! ==========
//! `authenticate` wraps every verifier in a deadline. A verifier that hangs
//! rejects the connection instead of parking the upgrade indefinitely; the
//! client is expected to reconnect.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Stable subject claim (user id, email, or device id).
    pub subject: String,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("credential required")]
    MissingCredential,
    #[error("invalid or expired credential")]
    Rejected,
    #[error("credential verification timed out")]
    Timeout,
    #[error("credential verification failed: {0}")]
    Backend(String),
}

impl crate::frame::ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "E_AUTH_MISSING",
            Self::Rejected => "E_AUTH_REJECTED",
            Self::Timeout => "E_AUTH_TIMEOUT",
            Self::Backend(_) => "E_AUTH_BACKEND",
        }
    }
}

#[async_trait::async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verify an optional credential with a bounded wait.
///
/// # Errors
///
/// `MissingCredential` when no token was presented, `Timeout` when the
/// verifier does not answer in time, otherwise whatever the verifier returns.
pub async fn authenticate(
    verifier: &dyn AuthVerifier,
    token: Option<&str>,
    deadline: Duration,
) -> Result<Identity, AuthError> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Err(AuthError::MissingCredential);
    };

    match tokio::time::timeout(deadline, verifier.verify(token)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout = ?deadline, "auth: verifier timed out");
            Err(AuthError::Timeout)
        }
    }
}

// =============================================================================
// SESSION TABLE
// =============================================================================

pub struct SessionVerifier {
    pool: PgPool,
}

impl SessionVerifier {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuthVerifier for SessionVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT subject, name FROM sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Backend(e.to_string()))?;

        let (subject, name) = row.ok_or(AuthError::Rejected)?;
        Ok(Identity { subject, name })
    }
}

// =============================================================================
// STATIC TOKENS
// =============================================================================

/// Fixed token → identity table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let tokens = pairs
            .iter()
            .map(|(token, subject)| (token.clone(), Identity { subject: subject.clone(), name: None }))
            .collect();
        Self { tokens }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait::async_trait]
impl AuthVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens.get(token).cloned().ok_or(AuthError::Rejected)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
