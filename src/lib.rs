//! Async client for the SAM v3 bridge of an I2P router.
//!
//! [`net`] mirrors `std::net` for I2P: [`I2pStream`], [`I2pListener`] and
//! [`I2pDatagramSocket`]. [`sam`] exposes the sessions underneath, including
//! PRIMARY sessions with subsessions and a self-healing listener.

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod net;
pub mod protocol;
pub mod sam;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::Cli;
pub use config::SamConfig;

pub use crate::core::StreamServer;
pub use domain::{Acceptor, DestinationKeys};
pub use net::{I2pAddr, I2pDatagramSocket, I2pListener, I2pSocketAddr, I2pStream};
pub use protocol::{SamOptions, SignatureType};
pub use sam::{SamConnection, Session, SessionManager, SessionStyle, SessionWatcher};
pub use utils::error::{Result, SamError};
