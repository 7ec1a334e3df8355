// ABOUTME: Application-wide error types and the shared error taxonomy.
// ABOUTME: Uses thiserror; every error can report an ErrorKind.

use crate::runtime::{ContainerError, ImageError, RuntimeError};
use std::path::PathBuf;
use thiserror::Error;

/// Classification shared by all error types, for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The engine or remote service could not be reached.
    Connectivity,
    NoSuchContainer,
    NoSuchImage,
    /// Removal of a running container without force.
    ContainerRunning,
    /// The active runtime variant does not support the operation.
    NotImplemented,
    /// Malformed data from the engine or the wire.
    Format,
    /// Bad flags or arguments, detected before any work starts.
    InvalidArgument,
    Cancelled,
    /// Anything else the engine reported.
    Runtime,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("unable to find container {name}: {source}")]
    Lookup {
        name: String,
        source: ContainerError,
    },

    #[error("unable to get latest container: {0}")]
    Latest(#[source] ContainerError),

    #[error("failed to wait for container {name}: {source}")]
    Wait {
        name: String,
        source: ContainerError,
    },

    /// Some items of a batch failed; each was already reported.
    #[error("{failed} of {total} operations failed")]
    Batch { failed: usize, total: usize },

    /// A failure already printed as a diagnostic; callers should not print it again.
    #[error("{0}")]
    Reported(#[source] Box<Error>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::ConfigNotFound(_) | Error::InvalidConfig(_) => {
                ErrorKind::InvalidArgument
            }
            Error::Yaml(_) => ErrorKind::InvalidArgument,
            Error::Runtime(e) => e.kind(),
            Error::Container(e) => e.kind(),
            Error::Image(e) => e.kind(),
            Error::Lookup { source, .. } | Error::Wait { source, .. } => source.kind(),
            Error::Latest(source) => source.kind(),
            Error::Reported(inner) => inner.kind(),
            Error::Batch { .. } | Error::Io(_) => ErrorKind::Runtime,
        }
    }

    /// Whether the message has already reached the user.
    pub fn is_reported(&self) -> bool {
        matches!(self, Error::Reported(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
