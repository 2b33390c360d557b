//! Gateway error types.

use thiserror::Error;

/// The external system a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Distributor,
    Payment,
    Identity,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::Distributor => "distributor",
            Service::Payment => "payment processor",
            Service::Identity => "identity provider",
        };
        write!(f, "{name}")
    }
}

/// A failed call to an external system.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The service answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}: {message}")]
    Http {
        service: Service,
        status: u16,
        message: String,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },

    /// The response body did not have the expected shape.
    #[error("Could not decode {service} response: {message}")]
    Decode { service: Service, message: String },

    /// The addressed resource does not exist.
    #[error("{service} resource not found: {resource}")]
    NotFound { service: Service, resource: String },
}

impl GatewayError {
    /// HTTP-style status of the failure, when the service produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            GatewayError::NotFound { .. } => Some(404),
            GatewayError::Transport { .. } | GatewayError::Decode { .. } => None,
        }
    }

    /// The service that failed.
    pub fn service(&self) -> Service {
        match self {
            GatewayError::Http { service, .. }
            | GatewayError::Transport { service, .. }
            | GatewayError::Decode { service, .. }
            | GatewayError::NotFound { service, .. } => *service,
        }
    }

    pub(crate) fn http(service: Service, status: u16, message: impl Into<String>) -> Self {
        GatewayError::Http {
            service,
            status,
            message: message.into(),
        }
    }
}

/// Convenience type alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A webhook whose authenticity could not be established.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingHeader,

    #[error("Malformed signature header")]
    MalformedHeader,

    #[error("Signature timestamp outside tolerance ({age_secs}s old)")]
    StaleTimestamp { age_secs: i64 },

    #[error("Signature mismatch")]
    Mismatch,

    /// Signature verified but the body is not a webhook event.
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}
