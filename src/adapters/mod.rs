// Adapters layer: the library's listeners behind the Acceptor port.

use async_trait::async_trait;

use crate::domain::ports::Acceptor;
use crate::net::{I2pListener, I2pSocketAddr, I2pStream};
use crate::sam::SessionWatcher;
use crate::utils::error::Result;

#[async_trait]
impl Acceptor for I2pListener {
    type Stream = I2pStream;

    async fn accept(&mut self) -> Result<(I2pStream, I2pSocketAddr)> {
        I2pListener::accept(self).await
    }

    fn local_addr(&self) -> I2pSocketAddr {
        I2pListener::local_addr(self)
    }
}

#[async_trait]
impl Acceptor for SessionWatcher {
    type Stream = I2pStream;

    async fn accept(&mut self) -> Result<(I2pStream, I2pSocketAddr)> {
        SessionWatcher::accept(self).await
    }

    fn local_addr(&self) -> I2pSocketAddr {
        self.listener().local_addr()
    }
}
