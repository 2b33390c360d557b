//! Cart session identification.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Request and response header carrying the cart session id.
pub const SESSION_HEADER: &str = "x-cart-session";

const MAX_SESSION_ID_LEN: usize = 64;

/// The cart session of a request.
///
/// Taken from [`SESSION_HEADER`] when it holds a well-formed id; otherwise a
/// fresh id is issued and the client is expected to send it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSession {
    id: String,
    issued: bool,
}

impl CartSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            issued: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the id was created for this request.
    pub fn is_new(&self) -> bool {
        self.issued
    }

    /// The header that hands the id back to the client.
    pub fn header(&self) -> [(&'static str, String); 1] {
        [(SESSION_HEADER, self.id.clone())]
    }

    fn from_header(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= MAX_SESSION_ID_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self {
            id: value.to_string(),
            issued: false,
        })
    }
}

impl Default for CartSession {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(CartSession::from_header);
        Ok(session.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_header_is_reused() {
        let session = CartSession::from_header("3f2b8c1e-1d2a-4e0b-9a7f-0c1d2e3f4a5b").unwrap();
        assert!(!session.is_new());
        assert_eq!(session.id(), "3f2b8c1e-1d2a-4e0b-9a7f-0c1d2e3f4a5b");
    }

    #[test]
    fn test_malformed_header_is_ignored() {
        assert!(CartSession::from_header("").is_none());
        assert!(CartSession::from_header("has space").is_none());
        assert!(CartSession::from_header(&"a".repeat(65)).is_none());
    }

    #[test]
    fn test_new_sessions_differ() {
        let a = CartSession::new();
        let b = CartSession::new();
        assert!(a.is_new());
        assert_ne!(a.id(), b.id());
    }
}
