use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::net::{I2pAddr, I2pSocketAddr};
use crate::protocol::{parse_peer_header, Command, ReplyKind};
use crate::sam::session::Session;
use crate::utils::error::Result;

/// A virtual stream carried over its own bridge connection.
#[derive(Debug)]
pub struct StreamConnect {
    conn: BufReader<TcpStream>,
    session: Session,
    peer_dest: String,
    peer_port: u16,
    local_port: u16,
}

impl StreamConnect {
    /// Connects through a new transient session.
    pub async fn connect<A: ToSocketAddrs>(
        sam_addr: A,
        destination: &str,
        port: u16,
    ) -> Result<StreamConnect> {
        let session = Session::transient(sam_addr).await?;
        Self::with_session(&session, destination, port).await
    }

    pub async fn with_session(
        session: &Session,
        destination: &str,
        port: u16,
    ) -> Result<StreamConnect> {
        Self::with_session_id(session, session.nickname(), destination, port).await
    }

    /// Connects as session `id`, which may be a subsession of `session`.
    pub async fn with_session_id(
        session: &Session,
        id: &str,
        destination: &str,
        port: u16,
    ) -> Result<StreamConnect> {
        let mut sam = session.open_connection().await?;
        let dest = sam.naming_lookup(destination).await?;

        sam.send(
            Command::StreamConnect {
                id: id.to_string(),
                destination: dest.clone(),
                to_port: port,
            },
            ReplyKind::StreamStatus,
        )
        .await?;
        tracing::debug!("{} connected to {}:{}", id, destination, port);

        Ok(StreamConnect {
            conn: sam.into_inner(),
            session: session.clone(),
            peer_dest: dest,
            peer_port: port,
            local_port: 0,
        })
    }

    /// Waits for the next incoming stream on `session`.
    pub async fn accept(session: &Session) -> Result<(StreamConnect, I2pSocketAddr)> {
        Self::accept_as(session, session.nickname()).await
    }

    pub async fn accept_as(session: &Session, id: &str) -> Result<(StreamConnect, I2pSocketAddr)> {
        let mut sam = session.open_connection().await?;
        sam.send(
            Command::StreamAccept { id: id.to_string() },
            ReplyKind::StreamStatus,
        )
        .await?;

        let line = sam.read_line_unbounded().await?;
        let header = parse_peer_header(&line)?;
        let addr = I2pSocketAddr::new(I2pAddr::from_b64(&header.destination)?, header.from_port);
        tracing::debug!("{} accepted stream from {}", id, addr);

        let stream = StreamConnect {
            conn: sam.into_inner(),
            session: session.clone(),
            peer_dest: header.destination,
            peer_port: header.from_port,
            local_port: header.to_port,
        };
        Ok((stream, addr))
    }

    /// The peer's full base64 destination.
    pub fn peer_destination(&self) -> &str {
        &self.peer_dest
    }

    pub fn peer_addr(&self) -> I2pSocketAddr {
        I2pSocketAddr::new(I2pAddr::new(&self.peer_dest), self.peer_port)
    }

    pub fn local_addr(&self) -> I2pSocketAddr {
        I2pSocketAddr::new(I2pAddr::new(self.session.local_dest()), self.local_port)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.conn.get_mut().shutdown().await?;
        Ok(())
    }
}

impl AsyncRead for StreamConnect {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.conn).poll_read(cx, buf)
    }
}

impl AsyncWrite for StreamConnect {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.conn).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.conn).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.conn).poll_shutdown(cx)
    }
}
