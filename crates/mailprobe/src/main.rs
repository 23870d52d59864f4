//! `mailprobe` - diagnose email account connectivity from the command line.
//!
//! Resolves a provider endpoint from an email address, probes it layer by
//! layer (TCP, TLS, IMAP greeting), and suggests alternative endpoints when
//! a layer fails. Ctrl-C cancels an in-flight probe and shuts the
//! connection registry down before exit.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use mailprobe_connect::{ConnectConfig, advisor, provider};
use mailprobe_core::{
    ConnectionService, Credentials, ErrorBody, MailConnector, MailSession, SessionError,
    TestRequest,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The CLI is diagnostics-only; named sessions are created by the embedding
/// front end, not here.
struct UnwiredConnector;

#[async_trait]
impl MailConnector for UnwiredConnector {
    async fn connect(
        &self,
        _config: &ConnectConfig,
        _credentials: &Credentials,
    ) -> Result<Box<dyn MailSession>, SessionError> {
        Err(SessionError::Connection(
            "no interactive mail client is wired into the CLI".to_string(),
        ))
    }
}

fn usage() -> ExitCode {
    eprintln!("usage: mailprobe <command> <address> [host] [port]");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  resolve <address>               print the resolved endpoint configuration");
    eprintln!("  test    <address> [host] [port] probe the endpoint layer by layer");
    eprintln!("  suggest <address>               print alternative endpoint candidates");
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailprobe=info,mailprobe_connect=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, address) = match (args.first(), args.get(1)) {
        (Some(command), Some(address)) => (command.as_str(), address.as_str()),
        _ => return usage(),
    };
    if !address.contains('@') {
        eprintln!("error: `{address}` is not an email address");
        return usage();
    }

    match command {
        "resolve" => run_resolve(address),
        "suggest" => run_suggest(address),
        "test" => {
            let host = args.get(2).cloned();
            let port = match args.get(3) {
                Some(raw) => match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => return usage(),
                },
                None => None,
            };
            run_test(address, host, port).await
        }
        _ => usage(),
    }
}

fn run_resolve(address: &str) -> ExitCode {
    let Some(resolution) = provider::resolve(address, None, None, None) else {
        return usage();
    };
    let config = &resolution.config;
    println!(
        "{}",
        json!({
            "provider": resolution.provider_name,
            "providerKey": resolution.provider_key,
            "host": config.host,
            "port": config.port,
            "security": match config.security {
                mailprobe_connect::Security::Implicit => "implicitTls",
                mailprobe_connect::Security::None => "none",
            },
            "connectTimeoutMs": config.connect_timeout.as_millis(),
            "authTimeoutMs": config.auth_timeout.as_millis(),
        })
    );
    ExitCode::SUCCESS
}

fn run_suggest(address: &str) -> ExitCode {
    println!("{}", json!({ "suggestions": advisor::suggest(address) }));
    ExitCode::SUCCESS
}

async fn run_test(address: &str, host: Option<String>, port: Option<u16>) -> ExitCode {
    let service = ConnectionService::new(Arc::new(UnwiredConnector));
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling probe");
                cancel.cancel();
            }
        })
    };

    let request = TestRequest {
        address: address.to_string(),
        provider_key: None,
        host,
        port,
    };
    let outcome = service.test_connection(&request, &cancel).await;

    watcher.abort();
    service.shutdown().await;

    match outcome {
        Ok(report) => {
            let ok = report.ok;
            match serde_json::to_string_pretty(&report) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => {
                    eprintln!("error: {err}");
                    return ExitCode::FAILURE;
                }
            }
            if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
        Err(err) => {
            let body = ErrorBody::from(&err);
            match serde_json::to_string_pretty(&body) {
                Ok(rendered) => eprintln!("{rendered}"),
                Err(render_err) => eprintln!("error: {render_err}"),
            }
            ExitCode::FAILURE
        }
    }
}
