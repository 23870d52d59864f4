//! Error types for the core connection services.

use serde::Serialize;
use thiserror::Error;

use crate::session::SessionError;

/// Errors surfaced by the registry and service layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed. Caller error, not retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Connect called for an id that already has a live record. The caller
    /// must disconnect first.
    #[error("connection id already in use: {0}")]
    DuplicateId(String),

    /// The operation referenced an id with no live record.
    #[error("no connection with id: {0}")]
    NotFound(String),

    /// Credentials rejected after a successful transport handshake.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The connect attempt exceeded its hard ceiling and was abandoned.
    #[error("connect attempt timed out: {0}")]
    ConnectTimeout(String),

    /// Transport-layer failure, already classified by the prober.
    #[error(transparent)]
    Probe(#[from] mailprobe_connect::Error),

    /// The external mail session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Wire-level error classification for the front end.
///
/// Every surfaced failure maps to exactly one category; the raw error text
/// travels alongside it, never in its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// Missing id/address/secret or malformed address.
    InvalidInput,
    /// Connect called for an already-live id.
    DuplicateId,
    /// Unknown connection id.
    NotFound,
    /// Host refused/unreachable/DNS failure, or the transport dropped
    /// before a greeting arrived.
    Unreachable,
    /// TLS handshake or certificate validation failure.
    TlsFailure,
    /// No valid greeting within the stage timeout.
    ProtocolTimeout,
    /// Credentials rejected by the remote server.
    AuthFailure,
    /// The caller withdrew the operation.
    Cancelled,
}

impl ErrorCategory {
    /// Classifies a transport-layer probe failure.
    #[must_use]
    pub const fn from_probe(err: &mailprobe_connect::Error) -> Self {
        match err {
            mailprobe_connect::Error::Unreachable(_)
            | mailprobe_connect::Error::InvalidDnsName(_) => Self::Unreachable,
            mailprobe_connect::Error::Tls(_) => Self::TlsFailure,
            mailprobe_connect::Error::ProtocolTimeout(_) => Self::ProtocolTimeout,
            mailprobe_connect::Error::Cancelled => Self::Cancelled,
        }
    }
}

impl Error {
    /// Maps this error to its wire category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::InvalidInput,
            Self::DuplicateId(_) => ErrorCategory::DuplicateId,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::AuthFailure(_) => ErrorCategory::AuthFailure,
            // An abandoned connect never produced a greeting in time.
            Self::ConnectTimeout(_) => ErrorCategory::ProtocolTimeout,
            Self::Probe(err) => ErrorCategory::from_probe(err),
            Self::Session(err) => match err {
                SessionError::Auth(_) => ErrorCategory::AuthFailure,
                SessionError::Connection(_) | SessionError::Operation(_) => {
                    ErrorCategory::Unreachable
                }
            },
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_has_one_category() {
        assert_eq!(
            Error::InvalidInput("missing id".into()).category(),
            ErrorCategory::InvalidInput
        );
        assert_eq!(
            Error::DuplicateId("work".into()).category(),
            ErrorCategory::DuplicateId
        );
        assert_eq!(
            Error::NotFound("work".into()).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            Error::Probe(mailprobe_connect::Error::Cancelled).category(),
            ErrorCategory::Cancelled
        );
        assert_eq!(
            Error::Session(SessionError::Auth("LOGIN failed".into())).category(),
            ErrorCategory::AuthFailure
        );
    }

    #[test]
    fn test_category_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorCategory::ProtocolTimeout).unwrap();
        assert_eq!(json, "\"protocolTimeout\"");
    }

    #[test]
    fn test_detail_survives_classification() {
        let err = Error::Probe(mailprobe_connect::Error::Unreachable(
            "connection refused (os error 111)".into(),
        ));
        assert_eq!(err.category(), ErrorCategory::Unreachable);
        assert!(err.to_string().contains("os error 111"));
    }
}
