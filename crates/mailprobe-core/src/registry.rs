//! Process-wide table of live, named mail sessions.
//!
//! The registry is an explicitly constructed store, not ambient global
//! state: callers (and tests) instantiate their own. It owns every
//! [`ConnectionRecord`] lifecycle: created only by a successful connect,
//! looked up by id for mailbox operations, destroyed by explicit disconnect
//! or by [`ConnectionRegistry::shutdown`] at process exit.
//!
//! Concurrency discipline: the table lock is a plain sync mutex held only
//! for bookkeeping, never across an await. A connect reserves its id under
//! the lock and then runs the external connect attempt outside it, so two
//! concurrent connects for one id can never both succeed while operations
//! on distinct ids never block one another. The reservation is released by
//! a drop guard, so it cannot outlive the attempt even when the connect
//! future is dropped mid-flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use mailprobe_connect::ConnectConfig;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::{Credentials, MailConnector, MailSession, SessionError};

/// Shared handle to a live session.
pub type SessionHandle = Arc<AsyncMutex<Box<dyn MailSession>>>;

/// One live, named mail session.
pub struct ConnectionRecord {
    /// Caller-supplied connection identifier.
    pub id: String,
    /// When the session was established.
    pub created_at: DateTime<Utc>,
    session: SessionHandle,
}

/// Table slot: either a reservation for an in-flight connect or a live
/// record. The reservation is what makes same-id connects mutually
/// exclusive without serializing distinct ids.
enum Slot {
    Connecting,
    Live(ConnectionRecord),
}

/// Snapshot row for listing connections.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionInfo {
    /// Connection identifier.
    pub id: String,
    /// True once the session is live (false while still connecting).
    pub connected: bool,
}

/// The process-wide connection table.
pub struct ConnectionRegistry {
    connector: Arc<dyn MailConnector>,
    slots: Mutex<HashMap<String, Slot>>,
}

/// Releases a `Connecting` reservation when the connect attempt ends,
/// whether it returned, errored, or was dropped at an await point.
struct Reservation<'a> {
    registry: &'a ConnectionRegistry,
    id: &'a str,
    armed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.registry.lock_slots();
            if matches!(slots.get(self.id), Some(Slot::Connecting)) {
                slots.remove(self.id);
            }
        }
    }
}

impl ConnectionRegistry {
    /// Creates a registry backed by the given connector.
    #[must_use]
    pub fn new(connector: Arc<dyn MailConnector>) -> Self {
        Self {
            connector,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Establishes a new named session.
    ///
    /// The external connect attempt is bounded by a hard ceiling of
    /// `connect_timeout + auth_timeout`; on expiry the in-flight attempt is
    /// dropped and reported as a timeout, never retried. The caller's
    /// cancellation token withdraws the attempt ahead of the ceiling. Every
    /// non-success exit, including cancellation or the future being
    /// dropped, releases the id reservation.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateId`] if the id already has a live or in-flight
    /// record (no implicit replace; disconnect first). A withdrawn attempt
    /// reports as cancelled. Otherwise any failure of the external connect,
    /// with no record left behind.
    pub async fn connect(
        &self,
        id: &str,
        config: &ConnectConfig,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<()> {
        {
            let mut slots = self.lock_slots();
            if slots.contains_key(id) {
                return Err(Error::DuplicateId(id.to_string()));
            }
            slots.insert(id.to_string(), Slot::Connecting);
        }
        let mut reservation = Reservation {
            registry: self,
            id,
            armed: true,
        };

        let ceiling = config.connect_timeout + config.auth_timeout;
        debug!(id, host = %config.host, ?ceiling, "connecting session");
        let attempt = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(id, "connect withdrawn by caller");
                return Err(Error::Probe(mailprobe_connect::Error::Cancelled));
            }
            res = timeout(ceiling, self.connector.connect(config, credentials)) => res,
        };

        match attempt {
            Ok(Ok(session)) => {
                reservation.armed = false;
                info!(id, host = %config.host, "session established");
                self.lock_slots().insert(
                    id.to_string(),
                    Slot::Live(ConnectionRecord {
                        id: id.to_string(),
                        created_at: Utc::now(),
                        session: Arc::new(AsyncMutex::new(session)),
                    }),
                );
                Ok(())
            }
            Ok(Err(err)) => Err(classify_connect_error(err)),
            Err(_) => Err(Error::ConnectTimeout(format!(
                "no session within {ceiling:?}"
            ))),
        }
    }

    /// Looks up a live session by id.
    ///
    /// Unknown or still-connecting ids return `None`; every mailbox
    /// operation must check this before use.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<SessionHandle> {
        let slots = self.lock_slots();
        match slots.get(id) {
            Some(Slot::Live(record)) => Some(Arc::clone(&record.session)),
            _ => None,
        }
    }

    /// Disconnects a named session.
    ///
    /// The session's own close is invoked and the record is removed
    /// unconditionally, even when close fails; the close failure comes back
    /// as `Ok(Some(_))` so the caller can report it separately.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an id with no live record. Not a no-op:
    /// callers rely on this to detect stale state.
    pub async fn disconnect(&self, id: &str) -> Result<Option<SessionError>> {
        let record = {
            let mut slots = self.lock_slots();
            match slots.remove(id) {
                Some(Slot::Live(record)) => record,
                Some(reservation) => {
                    // An in-flight connect is not a live record yet.
                    slots.insert(id.to_string(), reservation);
                    return Err(Error::NotFound(id.to_string()));
                }
                None => return Err(Error::NotFound(id.to_string())),
            }
        };

        let close_result = record.session.lock().await.close().await;
        match close_result {
            Ok(()) => {
                info!(id, "session disconnected");
                Ok(None)
            }
            Err(err) => {
                warn!(id, error = %err, "session close failed; record removed anyway");
                Ok(Some(err))
            }
        }
    }

    /// Closes every live session and clears the table.
    ///
    /// Best-effort: a failing close is logged and does not stop the rest.
    /// Invoked once at process termination; no session may outlive it.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, Slot)> = {
            let mut slots = self.lock_slots();
            slots.drain().collect()
        };

        let total = drained.len();
        for (id, slot) in drained {
            if let Slot::Live(record) = slot {
                if let Err(err) = record.session.lock().await.close().await {
                    warn!(id, error = %err, "close failed during shutdown");
                }
            }
        }
        info!(connections = total, "registry shut down");
    }

    /// Snapshot of current connection ids and their state.
    #[must_use]
    pub fn list(&self) -> Vec<ConnectionInfo> {
        let slots = self.lock_slots();
        let mut infos: Vec<ConnectionInfo> = slots
            .iter()
            .map(|(id, slot)| ConnectionInfo {
                id: id.clone(),
                connected: matches!(slot, Slot::Live(_)),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Number of records currently held (live or connecting).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    /// True when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }
}

/// Authentication failures get their own category; everything else stays a
/// session error.
fn classify_connect_error(err: SessionError) -> Error {
    match err {
        SessionError::Auth(detail) => Error::AuthFailure(detail),
        other => Error::Session(other),
    }
}
