//! Credential extraction and the authenticated-request extractor.
//!
//! A credential may arrive as `Authorization: Bearer <t>`, a bare `token`
//! header, or a `?token=` query parameter. Browser sockets cannot set
//! headers, so the query form exists for them.

use axum::Json;
use axum::extract::{FromRef, Query};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::frame::ErrorCode;
use crate::services::auth::{self as auth_svc, AuthError, Identity};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CredentialQuery {
    pub token: Option<String>,
}

/// First non-empty credential from the bearer header, `token` header, or
/// query string, in that order.
#[must_use]
pub fn extract_credential(headers: &HeaderMap, query: &CredentialQuery) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")));
    let token_header = headers.get("token").and_then(|v| v.to_str().ok());

    [bearer, token_header, query.token.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Verify the credential on a request's parts against the state's verifier.
///
/// # Errors
///
/// Any `AuthError` from `authenticate`.
pub async fn authenticate_parts(parts: &Parts, state: &AppState) -> Result<Identity, AuthError> {
    let query = Query::<CredentialQuery>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    let token = extract_credential(&parts.headers, &query);
    auth_svc::authenticate(state.verifier.as_ref(), token.as_deref(), state.config.auth_timeout).await
}

// =============================================================================
// REJECTION
// =============================================================================

/// HTTP response for a failed handshake or query authentication.
#[derive(Debug)]
pub struct AuthRejection(pub AuthError);

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AuthError::MissingCredential | AuthError::Rejected | AuthError::Timeout => StatusCode::UNAUTHORIZED,
            AuthError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = json!({ "code": self.0.error_code(), "message": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller. Use as a handler parameter to require a credential.
pub struct Authenticated(pub Identity);

impl<S> axum::extract::FromRequestParts<S> for Authenticated
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        authenticate_parts(parts, &app_state).await.map(Self).map_err(AuthRejection)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
