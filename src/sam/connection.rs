use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::domain::model::DestinationKeys;
use crate::protocol::{parse_reply, Command, Reply, ReplyKind, SignatureType};
use crate::utils::error::{Result, SamError};

pub const DEFAULT_API: &str = "127.0.0.1:7656";

pub const SAM_MIN: &str = "3.0";
pub const SAM_MAX: &str = "3.3";

/// A TCP connection to the SAM bridge that has completed the HELLO
/// handshake.
#[derive(Debug)]
pub struct SamConnection {
    conn: BufReader<TcpStream>,
    sam_api: SocketAddr,
    version: String,
    reply_timeout: Option<Duration>,
}

impl SamConnection {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<SamConnection> {
        Self::connect_timeout(addr, None).await
    }

    /// Connects and bounds every reply wait by `reply_timeout`.
    pub async fn connect_timeout<A: ToSocketAddrs>(
        addr: A,
        reply_timeout: Option<Duration>,
    ) -> Result<SamConnection> {
        let stream = TcpStream::connect(addr).await?;
        let sam_api = stream.peer_addr()?;

        let mut conn = SamConnection {
            conn: BufReader::new(stream),
            sam_api,
            version: String::new(),
            reply_timeout,
        };
        conn.handshake().await?;

        Ok(conn)
    }

    async fn handshake(&mut self) -> Result<()> {
        let reply = self
            .send(
                Command::Hello {
                    min: SAM_MIN.to_string(),
                    max: SAM_MAX.to_string(),
                },
                ReplyKind::Hello,
            )
            .await?;
        self.version = reply.get("VERSION").unwrap_or(SAM_MIN).to_string();
        tracing::debug!("SAM bridge {} speaks version {}", self.sam_api, self.version);
        Ok(())
    }

    /// Sends one command and waits for the matching reply line.
    pub async fn send(&mut self, command: Command, kind: ReplyKind) -> Result<Reply> {
        let line = command.to_line();
        tracing::debug!("-> {}", line.trim_end());
        self.conn.get_mut().write_all(line.as_bytes()).await?;

        loop {
            let reply_line = self.read_line().await?;
            tracing::debug!("<- {}", reply_line.trim_end());

            // SAM 3.2 bridges may ping an idle control connection
            if let Some(payload) = reply_line.strip_prefix("PING") {
                let pong = format!("PONG{}", payload);
                self.conn.get_mut().write_all(pong.as_bytes()).await?;
                continue;
            }

            return parse_reply(kind, &reply_line)?.check();
        }
    }

    /// Reads one `\n` terminated line, honouring the reply timeout.
    pub(crate) async fn read_line(&mut self) -> Result<String> {
        let mut buffer = String::new();
        let read = match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, self.conn.read_line(&mut buffer))
                .await
                .map_err(|_| SamError::ReplyTimeout(limit))??,
            None => self.conn.read_line(&mut buffer).await?,
        };
        if read == 0 {
            return Err(SamError::ConnectionClosed);
        }
        Ok(buffer)
    }

    /// Reads a line with no timeout, for waits that last until a peer shows
    /// up (`STREAM ACCEPT`).
    pub(crate) async fn read_line_unbounded(&mut self) -> Result<String> {
        let mut buffer = String::new();
        if self.conn.read_line(&mut buffer).await? == 0 {
            return Err(SamError::ConnectionClosed);
        }
        Ok(buffer)
    }

    pub async fn naming_lookup(&mut self, name: &str) -> Result<String> {
        let reply = self
            .send(
                Command::NamingLookup {
                    name: name.to_string(),
                },
                ReplyKind::NamingReply,
            )
            .await?;
        Ok(reply.require("VALUE")?.to_string())
    }

    pub async fn generate_destination(
        &mut self,
        signature_type: SignatureType,
    ) -> Result<DestinationKeys> {
        let reply = self
            .send(Command::DestGenerate { signature_type }, ReplyKind::DestReply)
            .await?;
        Ok(DestinationKeys {
            public: reply.require("PUB")?.to_string(),
            secret: reply.require("PRIV")?.to_string(),
            signature_type,
        })
    }

    pub fn sam_api(&self) -> SocketAddr {
        self.sam_api
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.conn.get_ref().local_addr()?)
    }

    /// Version negotiated in the handshake, e.g. `3.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.conn.get_mut().shutdown().await?;
        Ok(())
    }

    /// Hands over the socket once it carries stream data. Bytes already
    /// buffered stay in the reader.
    pub(crate) fn into_inner(self) -> BufReader<TcpStream> {
        self.conn
    }
}
