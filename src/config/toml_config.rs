use crate::net::{I2pDatagramSocket, DEFAULT_UDP_PORT};
use crate::protocol::SamOptions;
use crate::sam::session::{SessionStyle, TRANSIENT};
use crate::sam::{SamConnection, SessionWatcher, DEFAULT_API};
use crate::utils::random;
use crate::utils::error::{Result, SamError};
use crate::utils::validation::{self, Validate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Settings file for the `i2p-sam` tool.
///
/// ```toml
/// [bridge]
/// endpoint = "127.0.0.1:7656"
/// reply_timeout_seconds = 30
///
/// [session]
/// nickname = "echo"
/// style = "stream"
///
/// [options.i2cp_options.router_options.inbound]
/// length = 2
/// ```
///
/// `[options]` tables are merged over the default options: a table that
/// leaves out `lease_set_enc_type` still gets the default `4,0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamConfig {
    pub bridge: BridgeConfig,
    pub session: SessionConfig,
    pub options: SamOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint: String,
    pub udp_port: u16,
    pub reply_timeout_seconds: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            endpoint: DEFAULT_API.to_string(),
            udp_port: DEFAULT_UDP_PORT,
            reply_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Generated per session when unset.
    pub nickname: Option<String>,
    /// What `serve` listens with: `stream` or `datagram`.
    pub style: SessionStyle,
    /// Private destination, or `TRANSIENT` for a throwaway one.
    pub destination: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            nickname: None,
            style: SessionStyle::Stream,
            destination: TRANSIENT.to_string(),
        }
    }
}

impl SamConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| SamError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        let mut config: SamConfig =
            toml::from_str(&processed).map_err(|e| SamError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;
        config.options = config.options.with_default_enc_types();
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.bridge.reply_timeout_seconds.map(Duration::from_secs)
    }

    /// Opens the watched listening session `serve` runs on, with the
    /// configured nickname and reply timeout.
    pub async fn session_watcher(&self, destination: &str) -> Result<SessionWatcher> {
        SessionWatcher::with_settings(
            &self.bridge.endpoint,
            destination,
            SessionStyle::Stream,
            self.options.clone(),
            self.session.nickname.as_deref(),
            self.reply_timeout(),
        )
        .await
    }

    /// Binds a datagram socket that sends through `bridge.udp_port`.
    pub async fn datagram_socket(&self, destination: &str) -> Result<I2pDatagramSocket> {
        let conn =
            SamConnection::connect_timeout(self.bridge.endpoint.as_str(), self.reply_timeout())
                .await?;
        let nickname = self
            .session
            .nickname
            .clone()
            .unwrap_or_else(random::nickname);
        I2pDatagramSocket::bind_with_connection(
            conn,
            destination,
            &nickname,
            &self.options,
            self.bridge.udp_port,
        )
        .await
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_endpoint("bridge.endpoint", &self.bridge.endpoint)?;
        validation::validate_port("bridge.udp_port", self.bridge.udp_port)?;

        if let Some(seconds) = self.bridge.reply_timeout_seconds {
            validation::validate_range("bridge.reply_timeout_seconds", seconds, 1, 3600)?;
        }

        if let Some(nickname) = &self.session.nickname {
            validation::validate_nickname("session.nickname", nickname)?;
        }
        validation::validate_non_empty_string("session.destination", &self.session.destination)?;
        if !matches!(
            self.session.style,
            SessionStyle::Stream | SessionStyle::Datagram
        ) {
            return Err(SamError::ConfigError {
                message: format!(
                    "session.style must be stream or datagram, got {}",
                    self.session.style
                ),
            });
        }

        if let Some(inbound) = self.options.inbound() {
            if let Some(length) = inbound.length {
                validation::validate_range("options.inbound.length", length, 0, 7)?;
            }
            if let Some(quantity) = inbound.quantity {
                validation::validate_range("options.inbound.quantity", quantity, 1, 16)?;
            }
        }
        if let Some(outbound) = self.options.outbound() {
            if let Some(length) = outbound.length {
                validation::validate_range("options.outbound.length", length, 0, 7)?;
            }
            if let Some(quantity) = outbound.quantity {
                validation::validate_range("options.outbound.quantity", quantity, 1, 16)?;
            }
        }

        Ok(())
    }
}

impl Validate for SamConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
