// ABOUTME: Startup error for selecting and connecting a runtime, SNAFU style.
// ABOUTME: Every variant is fatal and classified as a connectivity failure.

use snafu::Snafu;

use super::detection::DetectionError;
use crate::error::ErrorKind;
use crate::rpc;

/// Failure to bring up a runtime. Aborts the command before any batch work.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("engine detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("cannot connect to engine at {socket}: {message}"))]
    LocalConnect { socket: String, message: String },

    #[snafu(display("cannot connect to remote service: {source}"))]
    RemoteConnect { source: rpc::Error },
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Connectivity
    }

    /// The engine socket or service address involved, when known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RuntimeError::LocalConnect { socket, .. } => Some(socket),
            RuntimeError::RemoteConnect {
                source: rpc::Error::Connect { address, .. },
            } => Some(address),
            _ => None,
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}

impl From<rpc::Error> for RuntimeError {
    fn from(source: rpc::Error) -> Self {
        RuntimeError::RemoteConnect { source }
    }
}
