//! Connection configuration types.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 143,
            Self::Implicit => 993,
        }
    }
}

/// Resolved endpoint configuration for one connection attempt.
///
/// `Security::Implicit` means a TLS handshake is mandatory before any
/// protocol byte is read.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (1-65535).
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Timeout for the TCP connect and the TLS handshake.
    pub connect_timeout: Duration,
    /// Timeout for the greeting read and server-side authentication.
    pub auth_timeout: Duration,
    /// Name presented for TLS verification when it differs from `host`.
    pub tls_server_name: Option<String>,
    /// Accept self-signed certificates. Only on-premise descriptors set this.
    pub allow_self_signed: bool,
}

impl ConnectConfig {
    /// Creates a configuration with implicit TLS on port 993 and generic
    /// timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 993,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(15),
            auth_timeout: Duration::from_secs(30),
            tls_server_name: None,
            allow_self_signed: false,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConnectConfigBuilder {
        ConnectConfigBuilder::new(host)
    }

    /// The name to verify the server certificate against.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    auth_timeout: Duration,
    tls_server_name: Option<String>,
    allow_self_signed: bool,
}

impl ConnectConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(15),
            auth_timeout: Duration::from_secs(30),
            tls_server_name: None,
            allow_self_signed: false,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connect/handshake timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the greeting/authentication timeout.
    #[must_use]
    pub const fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Sets an explicit TLS verification name.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Allows self-signed certificates.
    #[must_use]
    pub const fn allow_self_signed(mut self, allow: bool) -> Self {
        self.allow_self_signed = allow;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ConnectConfig {
        ConnectConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            auth_timeout: self.auth_timeout,
            tls_server_name: self.tls_server_name,
            allow_self_signed: self.allow_self_signed,
        }
    }
}
