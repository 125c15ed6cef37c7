//! `std::net`-style types over I2P: addresses, streams, listeners and
//! datagram sockets.

pub mod address;
pub mod datagram;
pub mod streaming;

pub use address::{I2pAddr, I2pSocketAddr, ToI2pSocketAddrs, B32_EXT, BASE32_I2P, BASE64_I2P};
pub use datagram::{I2pDatagramSocket, DEFAULT_UDP_PORT};
pub use streaming::{I2pListener, I2pStream};
