//! SAM bridge connections, sessions and the streams they carry.

pub mod connection;
pub mod manager;
pub mod session;
pub mod stream;
pub mod watcher;

pub use connection::{SamConnection, DEFAULT_API};
pub use manager::{SessionManager, SubSession};
pub use session::{Session, SessionStyle, TRANSIENT};
pub use stream::StreamConnect;
pub use watcher::SessionWatcher;
