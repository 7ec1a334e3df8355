// ABOUTME: Container operations trait for both runtime variants.
// ABOUTME: Lookup, state/config fetch, removal, storage repair, and wait-for-exit.

use super::sealed::Sealed;
use super::shared_types::{Container, ContainerConfig, ContainerState, RemoveOptions};
use crate::error::ErrorKind;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// List every container the engine knows about, running or not.
    async fn list_containers(&self) -> Result<Vec<Container>, ContainerError>;

    /// Resolve a full ID, ID prefix, or name to a container view.
    async fn lookup_container(&self, id_or_name: &str) -> Result<Container, ContainerError>;

    /// The most recently created container.
    async fn get_latest_container(&self) -> Result<Container, ContainerError>;

    /// Fetch the current state. Each call goes back to the engine.
    async fn container_state(&self, container: &Container)
    -> Result<ContainerState, ContainerError>;

    /// Fetch the stored configuration of a container.
    async fn container_config(&self, id_or_name: &str) -> Result<ContainerConfig, ContainerError>;

    /// Remove a container. Fails with [`ContainerError::Running`] unless forced.
    async fn remove_container(
        &self,
        container: &Container,
        opts: RemoveOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ContainerError>;

    /// Best-effort removal of containers that lookups can no longer find.
    async fn remove_containers_from_storage(&self, ids_or_names: &[String])
    -> Result<(), ContainerError>;

    /// Block until the container stops and return its exit code.
    ///
    /// State is polled every `interval`. A zero interval is rejected before
    /// the first poll.
    async fn wait_for_exit(
        &self,
        container: &Container,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<i32, ContainerError> {
        if interval.is_zero() {
            return Err(ContainerError::InvalidArgument(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        loop {
            let state = self.container_state(container).await?;
            if !state.status.is_active() {
                return Ok(state.exit_code);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(ContainerError::Cancelled(container.id.to_string()));
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("no such container: {0}")]
    NotFound(String),

    #[error("container {0} is running; stop it first or force removal")]
    Running(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("malformed container data: {0}")]
    Format(String),

    #[error("runtime connection failed: {0}")]
    Connectivity(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cancelled while handling container {0}")]
    Cancelled(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ContainerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContainerError::NotFound(_) => ErrorKind::NoSuchContainer,
            ContainerError::Running(_) => ErrorKind::ContainerRunning,
            ContainerError::NotImplemented(_) => ErrorKind::NotImplemented,
            ContainerError::Format(_) => ErrorKind::Format,
            ContainerError::Connectivity(_) => ErrorKind::Connectivity,
            ContainerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ContainerError::Cancelled(_) => ErrorKind::Cancelled,
            ContainerError::Runtime(_) => ErrorKind::Runtime,
        }
    }
}
