//! Provider descriptor table and endpoint resolution.
//!
//! Well-known mail providers are described by a static, ordered table of
//! [`ProviderDescriptor`] entries. Resolution is a pure function over that
//! table: it performs no I/O and, given the same address and overrides,
//! always produces the same configuration.

use std::time::Duration;

use crate::config::{ConnectConfig, Security};

/// How a descriptor derives the server hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRule {
    /// A fixed, well-known hostname.
    Fixed(&'static str),
    /// `imap.<domain>` derived from the address domain.
    ImapSubdomain,
}

/// Static description of one mail provider's IMAP endpoint.
///
/// Descriptors are registered at process start and never mutated. Keys are
/// unique; `domain_patterns` are matched as case-insensitive substrings of
/// the address domain, in table order, first match wins.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDescriptor {
    /// Unique key, usable as an explicit override.
    pub key: &'static str,
    /// Human-readable provider name.
    pub display_name: &'static str,
    /// Hostname derivation rule.
    pub host: HostRule,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Timeout for TCP connect and TLS handshake.
    pub connect_timeout: Duration,
    /// Timeout for greeting read and authentication. Static per provider;
    /// providers known to authenticate slowly get a longer value.
    pub auth_timeout: Duration,
    /// Accept self-signed certificates. Set only for on-premise entries.
    pub allow_self_signed: bool,
    /// Domain substrings that select this descriptor.
    pub domain_patterns: &'static [&'static str],
}

const GENERIC_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const GENERIC_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback descriptor for unrecognized domains.
pub static GENERIC: ProviderDescriptor = ProviderDescriptor {
    key: "generic",
    display_name: "Generic IMAP",
    host: HostRule::ImapSubdomain,
    port: 993,
    security: Security::Implicit,
    connect_timeout: GENERIC_CONNECT_TIMEOUT,
    auth_timeout: GENERIC_AUTH_TIMEOUT,
    allow_self_signed: false,
    domain_patterns: &[],
};

/// Ordered table of known providers. Order matters: detection takes the
/// first entry whose pattern matches the domain.
pub static PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        key: "gmail",
        display_name: "Gmail",
        host: HostRule::Fixed("imap.gmail.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        auth_timeout: GENERIC_AUTH_TIMEOUT,
        allow_self_signed: false,
        domain_patterns: &["gmail.com", "googlemail.com"],
    },
    ProviderDescriptor {
        key: "outlook",
        display_name: "Outlook / Office 365",
        host: HostRule::Fixed("outlook.office365.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        // Office 365 is markedly slower to complete LOGIN than other
        // public providers.
        auth_timeout: Duration::from_secs(60),
        allow_self_signed: false,
        domain_patterns: &["outlook.", "hotmail.", "live.", "office365", "msn.com"],
    },
    ProviderDescriptor {
        key: "yahoo",
        display_name: "Yahoo Mail",
        host: HostRule::Fixed("imap.mail.yahoo.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        auth_timeout: GENERIC_AUTH_TIMEOUT,
        allow_self_signed: false,
        domain_patterns: &["yahoo.", "ymail.com"],
    },
    ProviderDescriptor {
        key: "icloud",
        display_name: "iCloud Mail",
        host: HostRule::Fixed("imap.mail.me.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        auth_timeout: GENERIC_AUTH_TIMEOUT,
        allow_self_signed: false,
        domain_patterns: &["icloud.com", "me.com", "mac.com"],
    },
    ProviderDescriptor {
        key: "fastmail",
        display_name: "Fastmail",
        host: HostRule::Fixed("imap.fastmail.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        auth_timeout: GENERIC_AUTH_TIMEOUT,
        allow_self_signed: false,
        domain_patterns: &["fastmail.com", "fastmail.fm"],
    },
    ProviderDescriptor {
        key: "one-com",
        display_name: "One.com",
        host: HostRule::Fixed("imap.one.com"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        // One.com webmail backends take their time over LOGIN.
        auth_timeout: Duration::from_secs(45),
        allow_self_signed: false,
        domain_patterns: &["one.com"],
    },
    ProviderDescriptor {
        key: "gmx",
        display_name: "GMX",
        host: HostRule::Fixed("imap.gmx.net"),
        port: 993,
        security: Security::Implicit,
        connect_timeout: GENERIC_CONNECT_TIMEOUT,
        auth_timeout: GENERIC_AUTH_TIMEOUT,
        allow_self_signed: false,
        domain_patterns: &["gmx."],
    },
];

impl ProviderDescriptor {
    /// Resolves this descriptor into a concrete configuration for the
    /// given address domain.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> ConnectConfig {
        let host = match self.host {
            HostRule::Fixed(host) => host.to_string(),
            HostRule::ImapSubdomain => format!("imap.{}", domain.to_lowercase()),
        };
        ConnectConfig {
            host,
            port: self.port,
            security: self.security,
            connect_timeout: self.connect_timeout,
            auth_timeout: self.auth_timeout,
            tls_server_name: None,
            allow_self_signed: self.allow_self_signed,
        }
    }
}

/// Outcome of resolution: the configuration plus the descriptor identity
/// it came from.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The concrete connection configuration.
    pub config: ConnectConfig,
    /// Key of the descriptor that produced it (`"custom"` for explicit
    /// host overrides).
    pub provider_key: &'static str,
    /// Human-readable provider name.
    pub provider_name: &'static str,
}

/// Looks up a registered descriptor by key.
#[must_use]
pub fn descriptor(key: &str) -> Option<&'static ProviderDescriptor> {
    PROVIDERS.iter().find(|p| p.key == key)
}

/// Auto-detects the provider for an address domain.
///
/// Matches the lowercased domain against each descriptor's patterns in
/// table order; unmatched domains get the [`GENERIC`] fallback.
#[must_use]
pub fn detect(domain: &str) -> &'static ProviderDescriptor {
    let domain = domain.to_lowercase();
    PROVIDERS
        .iter()
        .find(|p| p.domain_patterns.iter().any(|pat| domain.contains(pat)))
        .unwrap_or(&GENERIC)
}

/// Returns the domain part of an address.
///
/// Addresses without `@` are a caller contract violation; validate before
/// resolving. This function degrades by treating the whole input as the
/// domain so resolution itself stays infallible.
#[must_use]
pub fn domain_of(address: &str) -> &str {
    address.rsplit_once('@').map_or(address, |(_, d)| d)
}

/// Resolves an address to a connection configuration.
///
/// Precedence: explicit host (with optional explicit port, defaulting to
/// 993 with implicit TLS and generic timeouts) beats an explicit provider
/// key, which beats domain auto-detection. Returns `None` only when
/// `explicit_provider` names no registered descriptor.
#[must_use]
pub fn resolve(
    address: &str,
    explicit_provider: Option<&str>,
    explicit_host: Option<&str>,
    explicit_port: Option<u16>,
) -> Option<Resolution> {
    if let Some(host) = explicit_host {
        let mut config = ConnectConfig::new(host);
        if let Some(port) = explicit_port {
            config.port = port;
        }
        return Some(Resolution {
            config,
            provider_key: "custom",
            provider_name: "Custom server",
        });
    }

    let desc = match explicit_provider {
        Some(key) => descriptor(key)?,
        None => detect(domain_of(address)),
    };
    let mut config = desc.resolve(domain_of(address));
    if let Some(port) = explicit_port {
        config.port = port;
    }
    Some(Resolution {
        config,
        provider_key: desc.key,
        provider_name: desc.display_name,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_keys_are_unique() {
        for (i, a) in PROVIDERS.iter().enumerate() {
            for b in &PROVIDERS[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }

    #[test]
    fn test_detect_gmail() {
        let desc = detect("gmail.com");
        assert_eq!(desc.key, "gmail");
        let desc = detect("GOOGLEMAIL.COM");
        assert_eq!(desc.key, "gmail");
    }

    #[test]
    fn test_detect_unknown_falls_back_to_generic() {
        assert_eq!(detect("unknown-corp.example").key, "generic");
    }

    #[test]
    fn test_resolve_one_com_by_own_domain() {
        let res = resolve("user@imap.one.com", None, None, None).unwrap();
        assert_eq!(res.provider_key, "one-com");
        assert_eq!(res.config.host, "imap.one.com");
        assert_eq!(res.config.port, 993);
        assert_eq!(res.config.auth_timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_resolve_generic_fallback() {
        let res = resolve("user@unknown-corp.example", None, None, None).unwrap();
        assert_eq!(res.provider_key, "generic");
        assert_eq!(res.config.host, "imap.unknown-corp.example");
        assert_eq!(res.config.port, 993);
        assert_eq!(res.config.security, Security::Implicit);
    }

    #[test]
    fn test_explicit_host_wins_over_known_domain() {
        let res = resolve("user@gmail.com", None, Some("mail.corp.example"), Some(1993)).unwrap();
        assert_eq!(res.provider_key, "custom");
        assert_eq!(res.config.host, "mail.corp.example");
        assert_eq!(res.config.port, 1993);
    }

    #[test]
    fn test_explicit_host_default_port() {
        let res = resolve("user@gmail.com", None, Some("mail.corp.example"), None).unwrap();
        assert_eq!(res.config.port, 993);
        assert_eq!(res.config.security, Security::Implicit);
    }

    #[test]
    fn test_explicit_provider_key() {
        let res = resolve("user@corp.example", Some("outlook"), None, None).unwrap();
        assert_eq!(res.config.host, "outlook.office365.com");
        assert_eq!(res.config.auth_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_provider_key_is_none() {
        assert!(resolve("user@corp.example", Some("no-such"), None, None).is_none());
    }

    #[test]
    fn test_outlook_gets_longer_auth_timeout() {
        let outlook = detect("hotmail.com");
        let gmail = detect("gmail.com");
        assert!(outlook.auth_timeout > gmail.auth_timeout);
    }
}
