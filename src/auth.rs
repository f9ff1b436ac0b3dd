use axum::{
    extract::{FromRef, FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::{config::AppConfig, error::AppError};

/// Header carrying the admin secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Query string fallback, for callers that cannot set headers (e.g. a link).
#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// AdminAccess Extractor Result
///
/// Proof that the request presented the configured admin secret. Taking it
/// as a handler argument is what gates the administrative endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

/// AdminAccess Extractor Implementation
///
/// Resolves the presented token from the `x-admin-token` header, falling back
/// to the `token` query parameter, and compares it to `AppConfig::admin_token`.
///
/// Rejection: `AppError::Unauthorized` (401) when the token is missing or wrong.
/// The response is the same in both cases.
impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let presented = presented_token(parts).ok_or(AppError::Unauthorized)?;

        if token_matches(&presented, &config.admin_token) {
            Ok(AdminAccess)
        } else {
            tracing::warn!(uri = %parts.uri.path(), "Rejected admin request with a wrong token");
            Err(AppError::Unauthorized)
        }
    }
}

fn presented_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
    })
}

/// Exact string match, evaluated in constant time over the bytes.
pub fn token_matches(presented: &str, secret: &str) -> bool {
    presented.as_bytes().ct_eq(secret.as_bytes()).into()
}
