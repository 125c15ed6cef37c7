use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamError {
    #[error("IO error (is the SAM bridge running?): {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to parse SAM message: {line:?}")]
    ParseError { line: String },

    #[error("SAM reply is missing field {field}")]
    MissingField { field: String },

    #[error("SAM bridge closed the connection")]
    ConnectionClosed,

    #[error("No reply from SAM bridge within {0:?}")]
    ReplyTimeout(Duration),

    #[error("Unable to resolve any address")]
    UnresolvableAddress,

    #[error("Invalid I2P socket address: {0}")]
    InvalidAddress(String),

    #[error("I2P address isn't a valid b32 or b64 encoding: {0}")]
    BadAddressEncoding(String),

    #[error("SAM bridge does not support the requested version: {0}")]
    NoVersion(String),

    #[error("Invalid or unrecognized SAM message: {0}")]
    InvalidMessage(String),

    #[error("Can't reach peer: {0}")]
    CantReachPeer(String),

    #[error("Destination key not found: {0}")]
    KeyNotFound(String),

    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Duplicate destination: {0}")]
    DuplicatedDest(String),

    #[error("Duplicate session id: {0}")]
    DuplicatedId(String),

    #[error("Invalid destination key: {0}")]
    InvalidKey(String),

    #[error("Invalid session id: {0}")]
    InvalidId(String),

    #[error("SAM timeout: {0}")]
    Timeout(String),

    #[error("I2P router error: {0}")]
    RouterError(String),

    #[error("Accept failed and the session was recreated, try the operation again")]
    SessionRecreated,

    #[error("Unknown subsession: {0}")]
    UnknownSubsession(String),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value {value:?} for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SamError>;

impl SamError {
    /// Maps a SAM `RESULT` code to an error. `OK` maps to `None`.
    pub fn from_result_code(code: &str, message: &str) -> Option<SamError> {
        let message = message.to_string();
        let err = match code {
            "OK" => return None,
            "CANT_REACH_PEER" => SamError::CantReachPeer(message),
            "KEY_NOT_FOUND" => SamError::KeyNotFound(message),
            "PEER_NOT_FOUND" => SamError::PeerNotFound(message),
            "DUPLICATED_DEST" => SamError::DuplicatedDest(message),
            "DUPLICATED_ID" => SamError::DuplicatedId(message),
            "INVALID_KEY" => SamError::InvalidKey(message),
            "INVALID_ID" => SamError::InvalidId(message),
            "TIMEOUT" => SamError::Timeout(message),
            "I2P_ERROR" => SamError::RouterError(message),
            "NOVERSION" => SamError::NoVersion(message),
            other => SamError::InvalidMessage(format!("{} {}", other, message).trim().to_string()),
        };
        Some(err)
    }

    /// Errors after which retrying the same operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SamError::IoError(_)
                | SamError::ConnectionClosed
                | SamError::ReplyTimeout(_)
                | SamError::CantReachPeer(_)
                | SamError::PeerNotFound(_)
                | SamError::Timeout(_)
                | SamError::RouterError(_)
                | SamError::SessionRecreated
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SamError::ConfigError { .. }
                | SamError::InvalidConfigValueError { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SamError::IoError(_) | SamError::ConnectionClosed => {
                "Could not talk to the SAM bridge".to_string()
            }
            SamError::ReplyTimeout(_) | SamError::Timeout(_) => {
                "The I2P router did not answer in time".to_string()
            }
            SamError::CantReachPeer(_) | SamError::PeerNotFound(_) => {
                "The destination is not reachable right now".to_string()
            }
            SamError::KeyNotFound(name) => format!("Could not resolve {}", name),
            err if err.is_config_error() => format!("Invalid configuration: {}", err),
            err => err.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SamError::IoError(_) | SamError::ConnectionClosed => {
                "Check that the I2P router is running and the SAM bridge is enabled on the configured port"
            }
            SamError::ReplyTimeout(_) | SamError::Timeout(_) => {
                "Tunnels may still be building, wait a minute and retry"
            }
            SamError::CantReachPeer(_) | SamError::PeerNotFound(_) => {
                "The peer may be offline or its lease set not yet published, retry later"
            }
            SamError::KeyNotFound(_) => {
                "Use a full destination or a b32 address, or add the host to the router's address book"
            }
            SamError::NoVersion(_) => "Upgrade the router to one that supports SAM 3.0 or newer",
            SamError::DuplicatedId(_) | SamError::DuplicatedDest(_) => {
                "Pick another nickname or close the session already using this destination"
            }
            SamError::InvalidKey(_) | SamError::BadAddressEncoding(_) => {
                "Check that the key or destination is complete I2P base64"
            }
            SamError::SessionRecreated => "Retry the accept call",
            err if err.is_config_error() => "Fix the configuration file or command line flags",
            _ => "Run with --verbose to see the SAM conversation",
        }
    }
}
