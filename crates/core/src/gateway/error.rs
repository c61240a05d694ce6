//! Error types for gateway calls.

use thiserror::Error;

/// Errors returned by the external services the saga depends on.
///
/// None of these are retried by the orchestrator; an error aborts the
/// instance that issued the call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service did not answer in time.
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// The service could not be reached.
    #[error("failed to connect to {service}: {message}")]
    ConnectionFailed {
        service: &'static str,
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}")]
    Http { service: &'static str, status: u16 },

    /// The response body could not be decoded.
    #[error("invalid response from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    /// The decision service claimed an assignment without naming a responder.
    #[error("invalid assignment decision for incident {incident_id}: {reason}")]
    InvalidDecision { incident_id: String, reason: String },

    /// Publishing an outbound message failed.
    #[error("failed to publish {message_type}: {message}")]
    Publish {
        message_type: String,
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl GatewayError {
    /// Map a reqwest transport error for the named service.
    pub(crate) fn from_reqwest(service: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout { service }
        } else if e.is_connect() {
            GatewayError::ConnectionFailed {
                service,
                message: e.to_string(),
            }
        } else if e.is_decode() {
            GatewayError::InvalidResponse {
                service,
                message: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            GatewayError::Http {
                service,
                status: status.as_u16(),
            }
        } else {
            GatewayError::ConnectionFailed {
                service,
                message: e.to_string(),
            }
        }
    }
}
