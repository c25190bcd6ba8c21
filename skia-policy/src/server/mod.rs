//! Unix socket query service for host processes

pub mod listener;
pub mod protocol;

pub use listener::{QueryServer, QueryServerConfig};
pub use protocol::{Request, Response};
