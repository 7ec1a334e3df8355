// ABOUTME: Error types for the RPC transport.
// ABOUTME: Separates link failures from errors the remote service reported.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid address {0:?}: expected unix:<path> or tcp:<host>:<port>")]
    InvalidAddress(String),

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The service answered with a varlink error reply.
    #[error("{name}: {detail}")]
    Remote { name: String, detail: String },
}

impl Error {
    /// True when the link itself failed rather than the call.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_) | Error::Connect { .. } | Error::Closed | Error::Io(_)
        )
    }

    /// Unqualified error name of a remote error, e.g. `ContainerNotFound`.
    pub fn remote_name(&self) -> Option<&str> {
        match self {
            Error::Remote { name, .. } => Some(name.rsplit('.').next().unwrap_or(name)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
