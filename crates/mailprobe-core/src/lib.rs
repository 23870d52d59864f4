//! # mailprobe-core
//!
//! Account-connection services for the mailprobe toolkit.
//!
//! This crate provides:
//! - The [`session`] capability traits the external IMAP client implements
//! - The [`registry`]: a process-wide table of live, named mail sessions
//! - The [`service`] facade the HTTP front end consumes: connect,
//!   disconnect, list connections, and test-connection
//! - A single error taxonomy with one wire category per failure
//!
//! The registry is injected, not global: construct one per process (or per
//! test) with the connector of your choice and shut it down before exit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod registry;
pub mod service;
pub mod session;

pub use error::{Error, ErrorCategory, Result};
pub use registry::{ConnectionInfo, ConnectionRecord, ConnectionRegistry, SessionHandle};
pub use service::{
    ConnectRequest, ConnectResponse, ConnectionService, ErrorBody, TestReport, TestRequest,
};
pub use session::{Credentials, MailConnector, MailSession, MessageSummary, SessionError};
