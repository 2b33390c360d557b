//! Identity authentication extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::IdentityId;
use gateway::IdentityProvider;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor that requires a signed-in identity.
///
/// The `Authorization: Bearer <token>` header is resolved through the
/// identity provider; a missing or rejected token is a 401. The identity is
/// never taken from the request body.
///
/// ```rust,ignore
/// async fn handler(Authenticated(identity): Authenticated) -> String {
///     format!("Hello, {identity}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated(pub IdentityId);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized)?;

        match state.identity.authenticate(token).await {
            Ok(identity) => Ok(Self(identity)),
            Err(e) if e.status() == Some(401) || e.status() == Some(403) => {
                tracing::info!(error = %e, "access token rejected");
                Err(ApiError::Unauthorized)
            }
            Err(e) => Err(ApiError::Gateway(e)),
        }
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer tok_1"), Some("tok_1"));
        assert_eq!(bearer_token("bearer  tok_1 "), Some("tok_1"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("tok_1"), None);
    }
}
