// ABOUTME: Client side of the remote service protocol.
// ABOUTME: Address parsing, NUL-framed JSON transport, and the shared connection.

mod address;
mod connection;
mod error;
mod transport;

pub use address::Address;
pub use connection::Connection;
pub use error::{Error, Result};
pub use transport::{Transport, VarlinkStream};
