use std::time::Duration;

use crate::net::{I2pListener, I2pSocketAddr, I2pStream};
use crate::protocol::SamOptions;
use crate::sam::connection::SamConnection;
use crate::sam::session::{Session, SessionStyle};
use crate::utils::error::{Result, SamError};
use crate::utils::random;

/// Keeps a listening session alive.
///
/// When an accept fails (router restart, dropped control connection) the
/// watcher throws the session away, creates a new one for the same
/// destination and reports [`SamError::SessionRecreated`]; the caller just
/// accepts again.
#[derive(Debug)]
pub struct SessionWatcher {
    sam_endpoint: String,
    destination: String,
    style: SessionStyle,
    options: SamOptions,
    nickname: Option<String>,
    reply_timeout: Option<Duration>,
    session: Session,
    listener: I2pListener,
    recreations: u64,
}

impl SessionWatcher {
    pub async fn new(
        sam_endpoint: &str,
        destination: &str,
        style: SessionStyle,
        options: SamOptions,
    ) -> Result<SessionWatcher> {
        Self::with_settings(sam_endpoint, destination, style, options, None, None).await
    }

    /// Like [`new`](Self::new), with a fixed base nickname and a reply
    /// timeout for the control connection and the streams it accepts.
    ///
    /// The first session is named `nickname`; recreated ones get a `-<n>`
    /// suffix since the bridge may still hold the old id.
    pub async fn with_settings(
        sam_endpoint: &str,
        destination: &str,
        style: SessionStyle,
        options: SamOptions,
        nickname: Option<&str>,
        reply_timeout: Option<Duration>,
    ) -> Result<SessionWatcher> {
        let first = nickname.map_or_else(random::nickname, str::to_string);
        let session = Self::open(
            sam_endpoint,
            destination,
            &first,
            style,
            &options,
            reply_timeout,
        )
        .await?;
        let listener = I2pListener::bind_with_session(&session);
        Ok(SessionWatcher {
            sam_endpoint: sam_endpoint.to_string(),
            destination: destination.to_string(),
            style,
            options,
            nickname: nickname.map(str::to_string),
            reply_timeout,
            session,
            listener,
            recreations: 0,
        })
    }

    async fn open(
        sam_endpoint: &str,
        destination: &str,
        nickname: &str,
        style: SessionStyle,
        options: &SamOptions,
        reply_timeout: Option<Duration>,
    ) -> Result<Session> {
        let conn = SamConnection::connect_timeout(sam_endpoint, reply_timeout).await?;
        Session::create_with_connection(conn, destination, nickname, style, options).await
    }

    pub async fn accept(&mut self) -> Result<(I2pStream, I2pSocketAddr)> {
        match self.listener.accept().await {
            Ok(accepted) => Ok(accepted),
            Err(e) => {
                tracing::warn!(
                    "accept on session {} failed: {}, recreating",
                    self.session.nickname(),
                    e
                );
                self.recreate().await?;
                Err(SamError::SessionRecreated)
            }
        }
    }

    async fn recreate(&mut self) -> Result<()> {
        if let Err(e) = self.session.close().await {
            tracing::debug!("closing stale session {}: {}", self.session.nickname(), e);
        }

        let nickname = match &self.nickname {
            Some(base) => format!("{}-{}", base, self.recreations + 1),
            None => random::nickname(),
        };
        let session = Self::open(
            &self.sam_endpoint,
            &self.destination,
            &nickname,
            self.style,
            &self.options,
            self.reply_timeout,
        )
        .await
        .map_err(|e| {
            tracing::error!("failed to recreate session: {}", e);
            e
        })?;
        self.listener = I2pListener::bind_with_session(&session);
        self.session = session;
        self.recreations += 1;
        tracing::info!(
            "session recreated as {} ({} so far)",
            self.session.nickname(),
            self.recreations
        );
        Ok(())
    }

    pub fn listener(&self) -> &I2pListener {
        &self.listener
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// How many times the session has been recreated.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }
}
