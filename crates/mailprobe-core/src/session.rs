//! The external mail-session capability.
//!
//! The full IMAP client is an external collaborator. This module pins down
//! the narrow interface the registry needs from it: a connector that turns a
//! resolved configuration plus credentials into a live session, and the
//! handful of mailbox operations a session supports. Keeping the capability
//! behind traits lets tests run the registry against mocks.

use async_trait::async_trait;
use mailprobe_connect::ConnectConfig;
use thiserror::Error;

/// Failures reported by the external mail capability.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Credentials rejected by the server.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport or protocol failure while connecting.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A mailbox operation failed.
    #[error("operation failed: {0}")]
    Operation(String),
}

/// Credentials for one account.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Login name, usually the full email address.
    pub username: String,
    /// Password or app-specific secret.
    pub secret: String,
}

impl Credentials {
    /// Creates credentials from an address and secret.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

/// Summary of one message, opaque to this layer.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    /// Server-assigned unique identifier.
    pub uid: u32,
    /// Message subject.
    pub subject: String,
    /// Sender address.
    pub from: String,
}

/// A live, authenticated mail session.
#[async_trait]
pub trait MailSession: Send {
    /// Closes the session and releases its server-side resources.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Lists mailbox names.
    async fn list_mailboxes(&mut self) -> Result<Vec<String>, SessionError>;

    /// Fetches the most recent `count` message summaries from the inbox.
    async fn fetch_recent(&mut self, count: u32) -> Result<Vec<MessageSummary>, SessionError>;

    /// Searches messages matching a server-side query.
    async fn search(&mut self, query: &str) -> Result<Vec<u32>, SessionError>;

    /// Deletes a message by uid.
    async fn delete(&mut self, uid: u32) -> Result<(), SessionError>;
}

/// Factory for mail sessions.
///
/// One `connect` call performs the full client-library attempt: transport,
/// TLS, greeting, and authentication. The registry bounds it with a hard
/// ceiling timeout.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Establishes and authenticates a session.
    async fn connect(
        &self,
        config: &ConnectConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn MailSession>, SessionError>;
}
