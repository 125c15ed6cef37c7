use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::net::I2pSocketAddr;
use crate::utils::error::Result;

/// Source of incoming streams for [`StreamServer`](crate::core::server::StreamServer).
#[async_trait]
pub trait Acceptor: Send {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    async fn accept(&mut self) -> Result<(Self::Stream, I2pSocketAddr)>;

    fn local_addr(&self) -> I2pSocketAddr;
}
