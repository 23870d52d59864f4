//! Request/response surface consumed by the HTTP front end.
//!
//! Four logical operations: connect, disconnect, list connections, and
//! test-connection. The front end itself is out of scope; this module owns
//! input validation, resolution, and the mapping of every failure to
//! exactly one [`ErrorCategory`] with its raw detail preserved alongside.
//! Nothing here retries: a failed connect or probe returns immediately and
//! any retry policy belongs to the caller.

use std::sync::Arc;

use mailprobe_connect::{advisor, probe, provider};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Error, ErrorCategory, Result};
use crate::registry::{ConnectionInfo, ConnectionRegistry};
use crate::session::{Credentials, MailConnector};

/// Connect a named account session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Caller-chosen connection identifier.
    pub id: String,
    /// Email address.
    pub address: String,
    /// Password or app-specific secret.
    pub secret: String,
    /// Explicit provider key override.
    #[serde(default)]
    pub provider_key: Option<String>,
    /// Explicit host override; wins over provider detection.
    #[serde(default)]
    pub host: Option<String>,
    /// Explicit port override.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Successful connect outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// Resolved server host.
    pub host: String,
    /// Resolved server port.
    pub port: u16,
    /// Human-readable provider name.
    pub provider_name: String,
}

/// Test an endpoint without creating a registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    /// Email address.
    pub address: String,
    /// Explicit provider key override.
    #[serde(default)]
    pub provider_key: Option<String>,
    /// Explicit host override.
    #[serde(default)]
    pub host: Option<String>,
    /// Explicit port override.
    #[serde(default)]
    pub port: Option<u16>,
}

/// Outcome of a connectivity test.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    /// Whether every stage passed.
    pub ok: bool,
    /// Host the probe targeted.
    pub host: String,
    /// Port the probe targeted.
    pub port: u16,
    /// Provider name used for resolution.
    pub provider_name: String,
    /// Deepest stage attempted (`tcp`, `tls`, or `greeting`).
    pub stage_reached: String,
    /// Raw server greeting, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,
    /// Raw failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Classified failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    /// Alternative endpoints worth trying, for transport-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Serializable error body for the front end.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Human-readable error with raw detail.
    pub error: String,
    /// Exactly one classification.
    pub error_category: ErrorCategory,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.to_string(),
            error_category: err.category(),
        }
    }
}

/// The account-connection service.
pub struct ConnectionService {
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionService {
    /// Creates a service backed by the given connector.
    #[must_use]
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(connector)),
        }
    }

    /// Access to the underlying registry, e.g. for shutdown wiring.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Resolves the address and establishes a named session.
    ///
    /// The cancellation token withdraws an in-flight connect; a withdrawn
    /// attempt reports [`ErrorCategory::Cancelled`] and leaves the id free
    /// for immediate reuse.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for missing fields, a malformed address, or
    /// an unknown provider key; otherwise whatever the registry reports.
    /// Suggestions are never attached here.
    pub async fn connect(
        &self,
        req: &ConnectRequest,
        cancel: &CancellationToken,
    ) -> Result<ConnectResponse> {
        require_field("id", &req.id)?;
        require_address(&req.address)?;
        require_field("secret", &req.secret)?;

        let resolution = resolve_request(
            &req.address,
            req.provider_key.as_deref(),
            req.host.as_deref(),
            req.port,
        )?;
        let credentials = Credentials::new(&req.address, &req.secret);

        self.registry
            .connect(&req.id, &resolution.config, &credentials, cancel)
            .await?;

        Ok(ConnectResponse {
            host: resolution.config.host,
            port: resolution.config.port,
            provider_name: resolution.provider_name.to_string(),
        })
    }

    /// Tears down a named session.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id. A close failure after removal
    /// is reported in the log, not as an operation failure.
    pub async fn disconnect(&self, id: &str) -> Result<()> {
        require_field("id", id)?;
        if let Some(close_err) = self.registry.disconnect(id).await? {
            warn!(id, error = %close_err, "disconnected with close failure");
        }
        Ok(())
    }

    /// Lists current connections.
    #[must_use]
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry.list()
    }

    /// Probes an endpoint layer by layer without touching the registry.
    ///
    /// This is the only operation that runs the prober and the advisor.
    /// Suggestions are attached only to unreachable/TLS/greeting-timeout
    /// outcomes, never to authentication or cancellation.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a malformed address or unknown provider
    /// key. Probe failures are not errors: they come back inside the
    /// report.
    pub async fn test_connection(
        &self,
        req: &TestRequest,
        cancel: &CancellationToken,
    ) -> Result<TestReport> {
        require_address(&req.address)?;
        let resolution = resolve_request(
            &req.address,
            req.provider_key.as_deref(),
            req.host.as_deref(),
            req.port,
        )?;

        let reports = probe::probe(&resolution.config, cancel).await;
        let Some(last) = reports.last() else {
            // The prober always attempts at least the TCP stage.
            return Err(Error::InvalidInput("empty probe".to_string()));
        };

        let (error, error_category, suggestions) = match &last.error {
            None => (None, None, None),
            Some(err) => {
                let suggestions = err
                    .is_suggestible()
                    .then(|| advisor::suggest(&req.address));
                (
                    Some(err.to_string()),
                    Some(ErrorCategory::from_probe(err)),
                    suggestions,
                )
            }
        };

        Ok(TestReport {
            ok: last.success,
            host: resolution.config.host,
            port: resolution.config.port,
            provider_name: resolution.provider_name.to_string(),
            stage_reached: last.stage.to_string(),
            greeting: last.greeting.clone(),
            error,
            error_category,
            suggestions,
        })
    }

    /// Shuts the registry down. Invoked once at process termination.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

fn resolve_request(
    address: &str,
    provider_key: Option<&str>,
    host: Option<&str>,
    port: Option<u16>,
) -> Result<provider::Resolution> {
    provider::resolve(address, provider_key, host, port).ok_or_else(|| {
        Error::InvalidInput(format!(
            "unknown provider key: {}",
            provider_key.unwrap_or_default()
        ))
    })
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("missing {name}")));
    }
    Ok(())
}

fn require_address(address: &str) -> Result<()> {
    require_field("address", address)?;
    if !address.contains('@') {
        return Err(Error::InvalidInput(format!(
            "malformed address: {address}"
        )));
    }
    Ok(())
}
