use dashmap::{DashMap, DashSet};
use tokio::net::ToSocketAddrs;

use crate::net::I2pSocketAddr;
use crate::protocol::{Command, ReplyKind, SamOptions};
use crate::sam::session::{Session, SessionStyle};
use crate::sam::stream::StreamConnect;
use crate::utils::error::{Result, SamError};
use crate::utils::random;

/// A subsession registered on the bridge under the primary session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubSession {
    pub id: String,
    pub style: SessionStyle,
    pub listen_port: u16,
}

/// Multiplexes several subsessions over one PRIMARY session, so they share
/// a single destination and its tunnels. Needs a SAM 3.3 bridge.
///
/// Subsessions are tracked by a caller chosen key; the manager can be
/// shared between tasks behind an `Arc`.
#[derive(Debug)]
pub struct SessionManager {
    primary: Session,
    subsessions: DashMap<String, SubSession>,
    /// Keys whose SESSION ADD is still in flight.
    pending: DashSet<String>,
}

/// Holds a key in `pending` until dropped, also when the add is cancelled.
struct PendingKey<'a> {
    pending: &'a DashSet<String>,
    key: &'a str,
}

impl Drop for PendingKey<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.key);
    }
}

impl SessionManager {
    pub fn new(primary: Session) -> SessionManager {
        SessionManager {
            primary,
            subsessions: DashMap::new(),
            pending: DashSet::new(),
        }
    }

    /// Creates the PRIMARY session and wraps it.
    pub async fn create<A: ToSocketAddrs>(
        sam_addr: A,
        destination: &str,
        options: &SamOptions,
    ) -> Result<SessionManager> {
        let primary = Session::create(
            sam_addr,
            destination,
            &random::nickname(),
            SessionStyle::Primary,
            options,
        )
        .await?;
        Ok(SessionManager::new(primary))
    }

    pub fn primary(&self) -> &Session {
        &self.primary
    }

    /// Adds a subsession under `key` and returns its generated id.
    ///
    /// The key is claimed before SESSION ADD goes out, so of several
    /// concurrent adds under one key only the first reaches the bridge.
    pub async fn add_subsession(
        &self,
        key: &str,
        style: SessionStyle,
        listen_port: u16,
        options: &SamOptions,
    ) -> Result<String> {
        // claim first, then look: a finished add is in `subsessions` before
        // it leaves `pending`
        if !self.pending.insert(key.to_string()) {
            return Err(SamError::DuplicatedId(key.to_string()));
        }
        let _claim = PendingKey {
            pending: &self.pending,
            key,
        };
        if self.subsessions.contains_key(key) {
            return Err(SamError::DuplicatedId(key.to_string()));
        }

        let id = random::subsession_id();
        self.primary
            .control_send(
                Command::SessionAdd {
                    style,
                    id: id.clone(),
                    args: format!("LISTEN_PORT={}", listen_port),
                    options: options.options(),
                },
                ReplyKind::SessionStatus,
            )
            .await?;
        tracing::info!("added {} subsession {} as {}", style, key, id);

        self.subsessions.insert(
            key.to_string(),
            SubSession {
                id: id.clone(),
                style,
                listen_port,
            },
        );
        Ok(id)
    }

    pub async fn remove_subsession(&self, key: &str) -> Result<()> {
        let id = self.subsession_id(key)?;
        self.primary
            .control_send(Command::SessionRemove { id: id.clone() }, ReplyKind::SessionStatus)
            .await?;
        self.subsessions.remove(key);
        tracing::info!("removed subsession {} ({})", key, id);
        Ok(())
    }

    pub fn subsession(&self, key: &str) -> Option<SubSession> {
        self.subsessions.get(key).map(|s| s.value().clone())
    }

    pub fn subsession_keys(&self) -> Vec<String> {
        self.subsessions.iter().map(|s| s.key().clone()).collect()
    }

    /// Waits for a stream addressed to the subsession under `key`.
    pub async fn accept(&self, key: &str) -> Result<(StreamConnect, I2pSocketAddr)> {
        let id = self.subsession_id(key)?;
        StreamConnect::accept_as(&self.primary, &id).await
    }

    pub async fn connect(&self, key: &str, destination: &str, port: u16) -> Result<StreamConnect> {
        let id = self.subsession_id(key)?;
        StreamConnect::with_session_id(&self.primary, &id, destination, port).await
    }

    fn subsession_id(&self, key: &str) -> Result<String> {
        self.subsessions
            .get(key)
            .map(|s| s.id.clone())
            .ok_or_else(|| SamError::UnknownSubsession(key.to_string()))
    }
}
