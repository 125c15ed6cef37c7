use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, ToSocketAddrs};

use crate::net::{I2pAddr, I2pSocketAddr, ToI2pSocketAddrs};
use crate::sam::{Session, StreamConnect, DEFAULT_API};
use crate::utils::error::{Result, SamError};

/// A stream between a local and a remote I2P destination, the analogue of
/// `tokio::net::TcpStream`.
///
/// ```no_run
/// use i2p_sam::net::I2pStream;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> i2p_sam::Result<()> {
/// let mut stream = I2pStream::connect("example.i2p:80").await?;
/// stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await?;
/// # Ok(())
/// # }
/// ```
pub struct I2pStream {
    inner: StreamConnect,
}

impl I2pStream {
    /// Connects through the bridge at [`DEFAULT_API`].
    pub async fn connect<A: ToI2pSocketAddrs>(addr: A) -> Result<I2pStream> {
        I2pStream::connect_via(DEFAULT_API, addr).await
    }

    /// Tries every bridge address against every I2P address and returns
    /// the first stream that connects.
    pub async fn connect_via<A: ToSocketAddrs, B: ToI2pSocketAddrs>(
        sam_addr: A,
        addr: B,
    ) -> Result<I2pStream> {
        let bridges: Vec<SocketAddr> = lookup_host(sam_addr).await?.collect();
        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            for bridge in &bridges {
                match StreamConnect::connect(bridge, addr.dest().as_str(), addr.port()).await {
                    Ok(inner) => return Ok(I2pStream { inner }),
                    Err(e) => {
                        tracing::debug!("connect to {} via {} failed: {}", addr, bridge, e);
                        last_err = Some(e);
                    }
                }
            }
        }
        Err(last_err.unwrap_or(SamError::UnresolvableAddress))
    }

    pub async fn connect_with_session<A: ToI2pSocketAddrs>(
        session: &Session,
        addr: A,
    ) -> Result<I2pStream> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or(SamError::UnresolvableAddress)?;
        let inner = StreamConnect::with_session(session, addr.dest().as_str(), addr.port()).await?;
        Ok(I2pStream { inner })
    }

    pub fn peer_addr(&self) -> I2pSocketAddr {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> I2pSocketAddr {
        self.inner.local_addr()
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    pub fn into_inner(self) -> StreamConnect {
        self.inner
    }
}

impl From<StreamConnect> for I2pStream {
    fn from(inner: StreamConnect) -> Self {
        I2pStream { inner }
    }
}

impl AsyncRead for I2pStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for I2pStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl fmt::Debug for I2pStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2pStream")
            .field("addr", &self.local_addr())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

/// Accepts streams addressed to a session's destination.
#[derive(Debug, Clone)]
pub struct I2pListener {
    session: Session,
}

impl I2pListener {
    /// Binds a transient destination through [`DEFAULT_API`].
    pub async fn bind() -> Result<I2pListener> {
        I2pListener::bind_via(DEFAULT_API).await
    }

    pub async fn bind_via<A: ToSocketAddrs>(sam_addr: A) -> Result<I2pListener> {
        let session = Session::transient(sam_addr).await?;
        Ok(I2pListener { session })
    }

    pub fn bind_with_session(session: &Session) -> I2pListener {
        I2pListener {
            session: session.clone(),
        }
    }

    /// The full local destination; connect to it with any port.
    pub fn local_addr(&self) -> I2pSocketAddr {
        I2pSocketAddr::new(I2pAddr::new(self.session.local_dest()), 0)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn accept(&self) -> Result<(I2pStream, I2pSocketAddr)> {
        let (inner, addr) = StreamConnect::accept(&self.session).await?;
        Ok((I2pStream { inner }, addr))
    }
}
