//! Endpoint suggestions for failed connection attempts.
//!
//! When a probe fails at the transport, TLS, or greeting layer, the advisor
//! proposes alternative `host:port` candidates from the provider table and
//! common hostname patterns for the failing domain. Pure pattern matching,
//! no I/O.

use crate::provider::{self, HostRule};

/// Maximum number of candidates returned. Advisory, not exhaustive.
pub const MAX_SUGGESTIONS: usize = 5;

/// Suggests alternative endpoints for an address, most specific first.
///
/// A recognized provider domain contributes its known endpoint at the top;
/// generic `imap.<domain>` and `mail.<domain>` candidates on the secure and
/// plaintext ports follow. Capped at [`MAX_SUGGESTIONS`], deduplicated.
#[must_use]
pub fn suggest(address: &str) -> Vec<String> {
    let domain = provider::domain_of(address).to_lowercase();
    let mut candidates = Vec::with_capacity(MAX_SUGGESTIONS);

    let desc = provider::detect(&domain);
    if let HostRule::Fixed(host) = desc.host {
        candidates.push(format!("{host}:{}", desc.port));
    }

    for port in [993u16, 143] {
        for host in [format!("imap.{domain}"), format!("mail.{domain}")] {
            let candidate = format!("{host}:{port}");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    candidates.truncate(MAX_SUGGESTIONS);
    candidates
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gmail_domain_suggests_known_endpoint_first() {
        let suggestions = suggest("user@gmail.com");
        assert_eq!(suggestions[0], "imap.gmail.com:993");
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn test_unknown_domain_gets_generic_patterns() {
        let suggestions = suggest("user@unknown-corp.example");
        assert_eq!(
            suggestions,
            vec![
                "imap.unknown-corp.example:993",
                "mail.unknown-corp.example:993",
                "imap.unknown-corp.example:143",
                "mail.unknown-corp.example:143",
            ]
        );
    }

    #[test]
    fn test_suggestions_are_bounded_and_unique() {
        let suggestions = suggest("user@yahoo.com");
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
        let mut deduped = suggestions.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), suggestions.len());
    }
}
