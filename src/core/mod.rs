pub mod server;

pub use crate::domain::ports::Acceptor;
pub use crate::utils::error::Result;
pub use server::StreamServer;
