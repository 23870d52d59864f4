//! # mailprobe-connect
//!
//! IMAP endpoint resolution and layered connectivity probing.
//!
//! ## Features
//!
//! - **Provider resolution**: a static, ordered table of provider
//!   descriptors maps an email address (or explicit overrides) to a concrete
//!   host/port/security/timeout configuration, with no I/O
//! - **Layered probing**: one cancellable probe checks TCP reachability,
//!   TLS handshake, and IMAP greeting liveness in strict order, classifying
//!   each failure before surfacing it
//! - **Diagnostic suggestions**: failed probes can be followed up with
//!   alternative `host:port` candidates derived from the failing domain
//! - **TLS via rustls**: secure connections without OpenSSL dependency
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailprobe_connect::{advisor, probe, provider};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let resolved = provider::resolve("user@example.com", None, None, None)
//!         .expect("no explicit provider given");
//!
//!     let cancel = CancellationToken::new();
//!     let reports = probe::probe(&resolved.config, &cancel).await;
//!
//!     if let Some(last) = reports.last() {
//!         if !last.success {
//!             println!("failed at {}: {:?}", last.stage, last.error);
//!             for candidate in advisor::suggest("user@example.com") {
//!                 println!("try {candidate}");
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: connection configuration and builder
//! - [`provider`]: provider descriptor table and resolution
//! - [`probe`]: the layered transport prober
//! - [`advisor`]: endpoint suggestions for failed probes
//! - [`stream`]: TLS connector plumbing shared by the prober

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod advisor;
pub mod config;
mod error;
pub mod probe;
pub mod provider;
pub mod stream;

pub use config::{ConnectConfig, ConnectConfigBuilder, Security};
pub use error::{Error, Result};
pub use probe::{ProbeStage, StageReport, probe};
pub use provider::{ProviderDescriptor, Resolution, resolve};
