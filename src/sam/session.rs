use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::ToSocketAddrs;
use tokio::sync::Mutex;

use crate::protocol::{Command, ReplyKind, SamOptions};
use crate::sam::connection::SamConnection;
use crate::utils::error::Result;
use crate::utils::random;

pub const TRANSIENT: &str = "TRANSIENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStyle {
    Stream,
    Datagram,
    Raw,
    Primary,
}

impl SessionStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStyle::Stream => "STREAM",
            SessionStyle::Datagram => "DATAGRAM",
            SessionStyle::Raw => "RAW",
            SessionStyle::Primary => "PRIMARY",
        }
    }
}

impl fmt::Display for SessionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SAM session. The bridge keeps the session alive as long as its control
/// connection is open, so clones share that connection and the session ends
/// when the last clone is dropped or [`Session::close`] is called.
#[derive(Debug, Clone)]
pub struct Session {
    control: Arc<Mutex<SamConnection>>,
    sam_api: SocketAddr,
    reply_timeout: Option<Duration>,
    local_dest: String,
    nickname: String,
    style: SessionStyle,
}

impl Session {
    pub async fn create<A: ToSocketAddrs>(
        sam_addr: A,
        destination: &str,
        nickname: &str,
        style: SessionStyle,
        options: &SamOptions,
    ) -> Result<Session> {
        let conn = SamConnection::connect(sam_addr).await?;
        Self::create_with_connection(conn, destination, nickname, style, options).await
    }

    /// Creates the session over an already negotiated connection; streams of
    /// this session inherit the connection's reply timeout.
    pub async fn create_with_connection(
        conn: SamConnection,
        destination: &str,
        nickname: &str,
        style: SessionStyle,
        options: &SamOptions,
    ) -> Result<Session> {
        Self::establish(conn, destination, nickname, style, String::new(), options).await
    }

    pub(crate) async fn establish(
        mut conn: SamConnection,
        destination: &str,
        nickname: &str,
        style: SessionStyle,
        args: String,
        options: &SamOptions,
    ) -> Result<Session> {
        let mut option_str = options.options();
        if destination == TRANSIENT {
            let sig = format!("SIGNATURE_TYPE={}", options.signature_type);
            option_str = if option_str.is_empty() {
                sig
            } else {
                format!("{} {}", sig, option_str)
            };
        }

        conn.send(
            Command::SessionCreate {
                style,
                id: nickname.to_string(),
                destination: destination.to_string(),
                args,
                options: option_str,
            },
            ReplyKind::SessionStatus,
        )
        .await?;

        let local_dest = conn.naming_lookup("ME").await?;
        tracing::info!("created {} session {} on {}", style, nickname, conn.sam_api());

        Ok(Session {
            sam_api: conn.sam_api(),
            reply_timeout: conn.reply_timeout(),
            control: Arc::new(Mutex::new(conn)),
            local_dest,
            nickname: nickname.to_string(),
            style,
        })
    }

    /// A stream session for an existing private destination, with a
    /// generated nickname.
    pub async fn from_destination<A: ToSocketAddrs>(
        sam_addr: A,
        destination: &str,
    ) -> Result<Session> {
        Self::create(
            sam_addr,
            destination,
            &random::nickname(),
            SessionStyle::Stream,
            &SamOptions::default(),
        )
        .await
    }

    /// A stream session with a fresh throwaway destination.
    pub async fn transient<A: ToSocketAddrs>(sam_addr: A) -> Result<Session> {
        Self::from_destination(sam_addr, TRANSIENT).await
    }

    pub fn sam_api(&self) -> SocketAddr {
        self.sam_api
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    /// The session's public destination in base64.
    pub fn local_dest(&self) -> &str {
        &self.local_dest
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn style(&self) -> SessionStyle {
        self.style
    }

    /// Opens another connection to the same bridge.
    pub async fn open_connection(&self) -> Result<SamConnection> {
        SamConnection::connect_timeout(self.sam_api, self.reply_timeout).await
    }

    pub async fn naming_lookup(&self, name: &str) -> Result<String> {
        self.control.lock().await.naming_lookup(name).await
    }

    /// Sends a command on the control connection.
    pub(crate) async fn control_send(&self, command: Command, kind: ReplyKind) -> Result<()> {
        self.control.lock().await.send(command, kind).await?;
        Ok(())
    }

    /// Closes the control connection, which ends the session for every clone.
    pub async fn close(&self) -> Result<()> {
        tracing::debug!("closing session {}", self.nickname);
        self.control.lock().await.shutdown().await
    }
}
