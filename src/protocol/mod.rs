//! SAM v3 wire format: command lines, reply parsing and session options.

pub mod command;
pub mod options;
pub mod reply;

pub use command::Command;
pub use options::{
    I2cpClientOptions, I2cpOptions, I2cpRouterOptions, LeaseSetAuthType, LeaseSetEncType,
    LeaseSetType, MessageReliability, RouterCryptoOptions, SamOptions, SignatureType,
    TunnelInboundOptions, TunnelOutboundOptions,
};
pub use reply::{parse_peer_header, parse_reply, PeerHeader, Reply, ReplyKind};
