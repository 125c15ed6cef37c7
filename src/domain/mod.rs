// Domain layer: shared models and the ports the server loop depends on.

pub mod model;
pub mod ports;

pub use crate::domain::model::DestinationKeys;
pub use crate::domain::ports::Acceptor;
pub use crate::utils::error::Result;
