//! Layered transport probing: TCP, then TLS, then protocol greeting.
//!
//! A probe is one self-contained connectivity check. The stages run
//! strictly in order, each bounded by its own timeout, and the probe stops
//! at the first failing stage. A single cancellation token threaded through
//! all stages lets the caller abort a probe at any suspension point; a
//! cancelled stage reports [`Error::Cancelled`], never a timeout.

use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{ConnectConfig, Security};
use crate::stream::{MaybeTlsStream, tls_connector, tls_connector_self_signed, tls_server_name};
use crate::{Error, Result};

/// One layer of connectivity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    /// Raw TCP connect.
    Tcp,
    /// TLS handshake over the open transport.
    Tls,
    /// IMAP greeting read.
    Greeting,
}

impl ProbeStage {
    /// Wire/display name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::Greeting => "greeting",
        }
    }
}

impl std::fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one attempted stage.
///
/// Exactly one of `success` or `error` holds: a successful stage carries no
/// error, a failed stage always carries its classified error.
#[derive(Debug)]
pub struct StageReport {
    /// The stage this report describes.
    pub stage: ProbeStage,
    /// Whether the stage completed successfully.
    pub success: bool,
    /// Host the probe targeted.
    pub host: String,
    /// Port the probe targeted.
    pub port: u16,
    /// Classified failure, present iff `success` is false.
    pub error: Option<Error>,
    /// Raw greeting line, present only on a successful greeting stage.
    pub greeting: Option<String>,
}

impl StageReport {
    fn passed(stage: ProbeStage, config: &ConnectConfig) -> Self {
        Self {
            stage,
            success: true,
            host: config.host.clone(),
            port: config.port,
            error: None,
            greeting: None,
        }
    }

    fn failed(stage: ProbeStage, config: &ConnectConfig, error: Error) -> Self {
        Self {
            stage,
            success: false,
            host: config.host.clone(),
            port: config.port,
            error: Some(error),
            greeting: None,
        }
    }
}

/// Runs a layered probe against the configured endpoint.
///
/// Returns one report per attempted stage, terminating at the first failure
/// or after the greeting stage. The TLS stage runs only for
/// [`Security::Implicit`]. The underlying socket is dropped, and thereby
/// closed, on every exit path.
pub async fn probe(config: &ConnectConfig, cancel: &CancellationToken) -> Vec<StageReport> {
    let mut reports = Vec::with_capacity(3);

    debug!(host = %config.host, port = config.port, "probe: tcp stage");
    let tcp = match tcp_stage(config, cancel).await {
        Ok(tcp) => {
            reports.push(StageReport::passed(ProbeStage::Tcp, config));
            tcp
        }
        Err(err) => {
            debug!(host = %config.host, port = config.port, error = %err, "probe: tcp stage failed");
            reports.push(StageReport::failed(ProbeStage::Tcp, config, err));
            return reports;
        }
    };

    let stream = match config.security {
        Security::Implicit => {
            debug!(host = %config.host, port = config.port, "probe: tls stage");
            match tls_stage(config, cancel, tcp).await {
                Ok(stream) => {
                    reports.push(StageReport::passed(ProbeStage::Tls, config));
                    stream
                }
                Err(err) => {
                    debug!(host = %config.host, error = %err, "probe: tls stage failed");
                    reports.push(StageReport::failed(ProbeStage::Tls, config, err));
                    return reports;
                }
            }
        }
        Security::None => MaybeTlsStream::plain(tcp),
    };

    debug!(host = %config.host, port = config.port, "probe: greeting stage");
    match greeting_stage(config, cancel, stream).await {
        Ok(greeting) => {
            debug!(host = %config.host, greeting = %greeting, "probe: greeting received");
            let mut report = StageReport::passed(ProbeStage::Greeting, config);
            report.greeting = Some(greeting);
            reports.push(report);
        }
        Err(err) => {
            debug!(host = %config.host, error = %err, "probe: greeting stage failed");
            reports.push(StageReport::failed(ProbeStage::Greeting, config, err));
        }
    }
    reports
}

async fn tcp_stage(config: &ConnectConfig, cancel: &CancellationToken) -> Result<TcpStream> {
    let addr = (config.host.clone(), config.port);
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = timeout(config.connect_timeout, TcpStream::connect(addr)) => match res {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => Err(Error::Unreachable(err.to_string())),
            Err(_) => Err(Error::Unreachable(format!(
                "connect timed out after {:?}",
                config.connect_timeout
            ))),
        },
    }
}

async fn tls_stage(
    config: &ConnectConfig,
    cancel: &CancellationToken,
    tcp: TcpStream,
) -> Result<MaybeTlsStream> {
    let connector = if config.allow_self_signed {
        tls_connector_self_signed()
    } else {
        tls_connector()
    };
    let name = tls_server_name(config.server_name())?;

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = timeout(config.connect_timeout, connector.connect(name, tcp)) => match res {
            Ok(Ok(stream)) => Ok(MaybeTlsStream::tls(stream)),
            Ok(Err(err)) => Err(Error::Tls(err.to_string())),
            Err(_) => Err(Error::Tls(format!(
                "handshake timed out after {:?}",
                config.connect_timeout
            ))),
        },
    }
}

async fn greeting_stage(
    config: &ConnectConfig,
    cancel: &CancellationToken,
    mut stream: MaybeTlsStream,
) -> Result<String> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = timeout(config.auth_timeout, read_greeting(&mut stream)) => match res {
            Ok(line) => line,
            Err(_) => Err(Error::ProtocolTimeout(config.auth_timeout)),
        },
    }
}

/// Reads lines until one containing the `OK` token arrives.
async fn read_greeting(stream: &mut MaybeTlsStream) -> Result<String> {
    let mut buf = BytesMut::with_capacity(512);
    loop {
        if let Some(line) = complete_line_with_ok(&buf) {
            return Ok(line);
        }
        let n = stream
            .read_buf(&mut buf)
            .await
            .map_err(|err| Error::Unreachable(format!("transport lost during greeting: {err}")))?;
        if n == 0 {
            return Err(Error::Unreachable(
                "server closed the connection before greeting".to_string(),
            ));
        }
    }
}

/// Scans buffered bytes for a complete line containing the `OK` token.
/// Bytes after the last newline are an incomplete line and are ignored.
fn complete_line_with_ok(buf: &[u8]) -> Option<String> {
    let end = buf.iter().rposition(|&b| b == b'\n')?;
    buf[..end]
        .split(|&b| b == b'\n')
        .find(|line| line.windows(2).any(|w| w == b"OK"))
        .map(|line| String::from_utf8_lossy(line).trim().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;

    fn quick_config(host: &str, port: u16, security: Security) -> ConnectConfig {
        ConnectConfig::builder(host)
            .port(port)
            .security(security)
            .connect_timeout(Duration::from_millis(500))
            .auth_timeout(Duration::from_millis(200))
            .build()
    }

    /// Binds and immediately drops a listener to obtain a port that
    /// refuses connections.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_line_scan_finds_ok() {
        assert_eq!(
            complete_line_with_ok(b"* OK Dovecot ready.\r\n"),
            Some("* OK Dovecot ready.".to_string())
        );
        assert_eq!(complete_line_with_ok(b"* BYE\r\n"), None);
        // Incomplete line is not a match yet.
        assert_eq!(complete_line_with_ok(b"* OK Dovecot"), None);
        // Match on a later line.
        assert_eq!(
            complete_line_with_ok(b"* BANNER\r\n* OK ready\r\n"),
            Some("* OK ready".to_string())
        );
    }

    #[tokio::test]
    async fn test_probe_closed_port_stops_at_tcp() {
        let port = closed_port().await;
        let config = quick_config("127.0.0.1", port, Security::Implicit);
        let reports = probe(&config, &CancellationToken::new()).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stage, ProbeStage::Tcp);
        assert!(!reports[0].success);
        assert!(matches!(reports[0].error, Some(Error::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_probe_silent_server_times_out_on_greeting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = quick_config("127.0.0.1", port, Security::None);

        let started = Instant::now();
        let reports = probe(&config, &CancellationToken::new()).await;
        let elapsed = started.elapsed();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].stage, ProbeStage::Tcp);
        assert!(reports[0].success);
        assert_eq!(reports[1].stage, ProbeStage::Greeting);
        assert!(matches!(reports[1].error, Some(Error::ProtocolTimeout(_))));
        // A 200ms greeting timeout must complete well within 400ms.
        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_probe_reads_greeting() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"* OK [CAPABILITY IMAP4rev1] server ready\r\n")
                .await
                .unwrap();
            // Hold the socket open so the probe sees the line, not EOF.
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let config = quick_config("127.0.0.1", port, Security::None);
        let reports = probe(&config, &CancellationToken::new()).await;

        let last = reports.last().unwrap();
        assert_eq!(last.stage, ProbeStage::Greeting);
        assert!(last.success);
        assert!(last.greeting.as_deref().unwrap().contains("server ready"));
    }

    #[tokio::test]
    async fn test_server_closing_before_greeting_names_the_stage() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let config = quick_config("127.0.0.1", port, Security::None);
        let reports = probe(&config, &CancellationToken::new()).await;

        let last = reports.last().unwrap();
        assert_eq!(last.stage, ProbeStage::Greeting);
        match &last.error {
            Some(Error::Unreachable(detail)) => assert!(detail.contains("before greeting")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_tls_against_plain_server_fails_at_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = quick_config("localhost", port, Security::Implicit);

        let reports = probe(&config, &CancellationToken::new()).await;

        assert_eq!(reports.len(), 2);
        assert!(reports[0].success);
        assert_eq!(reports[1].stage, ProbeStage::Tls);
        assert!(matches!(reports[1].error, Some(Error::Tls(_))));
    }

    #[tokio::test]
    async fn test_cancelled_probe_reports_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        // Long timeout so only cancellation can end the greeting wait.
        let config = ConnectConfig::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .auth_timeout(Duration::from_secs(30))
            .build();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let reports = probe(&config, &cancel).await;

        let last = reports.last().unwrap();
        assert_eq!(last.stage, ProbeStage::Greeting);
        assert!(matches!(last.error, Some(Error::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancellation_beats_timeout_at_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = quick_config("127.0.0.1", port, Security::None);

        // Pre-cancelled token: even with the timeout expired the outcome
        // must be Cancelled, not ProtocolTimeout.
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(250)).await;

        let reports = probe(&config, &cancel).await;
        let last = reports.last().unwrap();
        assert!(matches!(last.error, Some(Error::Cancelled)));
    }
}
