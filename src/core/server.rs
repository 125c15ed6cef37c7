use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::core::Acceptor;
use crate::net::I2pSocketAddr;
use crate::utils::error::{Result, SamError};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Accept loop that hands every incoming stream to its own task.
pub struct StreamServer<A: Acceptor> {
    acceptor: A,
    retry_delay: Duration,
}

impl<A: Acceptor> StreamServer<A> {
    pub fn new(acceptor: A) -> Self {
        Self {
            acceptor,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Pause after a failed accept before trying again.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    /// Runs until `shutdown` resolves and returns how many streams were
    /// accepted. Handlers still running at shutdown are aborted.
    pub async fn run<H, Fut, S>(&mut self, handler: H, shutdown: S) -> Result<u64>
    where
        H: Fn(A::Stream, I2pSocketAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        let mut tasks = JoinSet::new();
        let mut accepted = 0u64;
        tokio::pin!(shutdown);

        tracing::info!("serving on {}", self.acceptor.local_addr());

        let retry_delay = self.retry_delay;
        loop {
            // an accept is never raced against handlers finishing: once the
            // bridge hands over a peer, dropping the accept would lose it
            let result = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.acceptor.accept() => result,
            };

            match result {
                Ok((stream, peer)) => {
                    accepted += 1;
                    tracing::debug!("accepted stream #{} from {}", accepted, peer);
                    let handler = Arc::clone(&handler);
                    tasks.spawn(async move { (*handler)(stream, peer).await });
                }
                Err(SamError::SessionRecreated) => {
                    tracing::info!("session recreated, accepting again");
                }
                Err(e) => {
                    tracing::warn!("accept failed: {}, retrying in {:?}", e, retry_delay);
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                match joined {
                    Ok(Err(e)) => tracing::warn!("handler failed: {}", e),
                    Err(e) if e.is_panic() => tracing::error!("handler panicked: {}", e),
                    _ => {}
                }
            }
        }

        if !tasks.is_empty() {
            tracing::debug!("aborting {} running handlers", tasks.len());
        }
        tasks.shutdown().await;
        tracing::info!("server stopped after {} streams", accepted);
        Ok(accepted)
    }
}
