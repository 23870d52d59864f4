//! Error types for the connection-probing library.

use std::time::Duration;

use thiserror::Error;

/// Classified transport-layer failures.
///
/// Every probe failure is mapped to exactly one of these variants before it
/// is surfaced. The raw socket or TLS library error text is preserved as the
/// variant's detail string; it supplements the classification but never
/// replaces it.
#[derive(Debug, Error)]
pub enum Error {
    /// The host could not be reached: DNS failure, connection refused,
    /// network unreachable, or a connect that never completed in time.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// TLS handshake or certificate validation failed.
    #[error("TLS failure: {0}")]
    Tls(String),

    /// The server accepted the transport but sent no valid greeting within
    /// the stage timeout.
    #[error("no greeting within {0:?}")]
    ProtocolTimeout(Duration),

    /// The caller withdrew the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The hostname is not a valid DNS name for TLS verification.
    #[error("invalid DNS name: {0}")]
    InvalidDnsName(String),
}

impl Error {
    /// Returns true for failures where alternative endpoint suggestions
    /// are worth showing to the user.
    #[must_use]
    pub const fn is_suggestible(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Tls(_) | Self::ProtocolTimeout(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestible_classification() {
        assert!(Error::Unreachable("refused".into()).is_suggestible());
        assert!(Error::Tls("bad cert".into()).is_suggestible());
        assert!(Error::ProtocolTimeout(Duration::from_millis(200)).is_suggestible());
        assert!(!Error::Cancelled.is_suggestible());
        assert!(!Error::InvalidDnsName("bad host".into()).is_suggestible());
    }

    #[test]
    fn test_display_preserves_detail() {
        let err = Error::Unreachable("connection refused (os error 111)".into());
        assert!(err.to_string().contains("os error 111"));
    }
}
