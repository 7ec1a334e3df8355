// ABOUTME: Remote runtime variant that talks to the engine's RPC service.
// ABOUTME: Reshapes wire records into the same views the local variant returns.

mod wire;

use crate::rpc::{self, Address, Connection};
use crate::runtime::error::{RemoteConnectSnafu, RuntimeError};
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    Container, ContainerConfig, ContainerError, ContainerImage, ContainerOps, ContainerState,
    ImageError, ImageHistory, ImageOps, PullOptions, RemoveOptions, Runtime, Variant,
};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use serde_json::json;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_container_error(e: rpc::Error, subject: &str) -> ContainerError {
    match e.remote_name() {
        Some("ContainerNotFound") | Some("NoContainerRunning") => {
            return ContainerError::NotFound(subject.to_string());
        }
        Some("ContainerRunning") => return ContainerError::Running(subject.to_string()),
        Some("MethodNotImplemented") => return ContainerError::NotImplemented(e.to_string()),
        _ => {}
    }

    if e.is_connectivity() {
        return ContainerError::Connectivity(e.to_string());
    }
    match e {
        rpc::Error::Protocol(err) => ContainerError::Format(err.to_string()),
        other => ContainerError::Runtime(other.to_string()),
    }
}

fn map_image_error(e: rpc::Error, subject: &str) -> ImageError {
    match e.remote_name() {
        Some("ImageNotFound") => return ImageError::NotFound(subject.to_string()),
        Some("MethodNotImplemented") => return ImageError::NotImplemented(e.to_string()),
        _ => {}
    }

    if e.is_connectivity() {
        return ImageError::Connectivity(e.to_string());
    }
    match e {
        rpc::Error::Protocol(err) => ImageError::Format(err.to_string()),
        other => ImageError::Runtime(other.to_string()),
    }
}

// =============================================================================
// Type Conversion Helpers
// =============================================================================

fn image_from_record(
    record: wire::ImageInList,
    input_name: impl Into<String>,
) -> Result<ContainerImage, ImageError> {
    let created = wire::parse_timestamp(&record.created).map_err(ImageError::Format)?;
    Ok(ContainerImage {
        id: ImageId::new(record.id),
        names: record.repo_tags,
        digest: (!record.digest.is_empty()).then_some(record.digest),
        size: u64::try_from(record.size).unwrap_or(0),
        created,
        parent: record.parent_id,
        is_parent: record.is_parent,
        labels: record.labels,
        input_name: input_name.into(),
    })
}

fn history_from_record(record: wire::ImageHistoryRecord) -> Result<ImageHistory, ImageError> {
    Ok(ImageHistory {
        created: wire::parse_timestamp(&record.created).map_err(ImageError::Format)?,
        id: record.id,
        created_by: record.created_by,
        size: record.size,
        comment: record.comment,
    })
}

fn container_from_record(record: wire::ContainerRecord) -> Container {
    let config = ContainerConfig {
        id: record.id.clone(),
        name: record.names.clone(),
        image: record.image,
        labels: record.labels,
        command: record.command,
    };
    Container::new(ContainerId::new(record.id), record.names, config)
}

/// Name a listed image is addressed by in later calls.
///
/// Only images carrying several tags are addressed by their first tag; all
/// others go by ID.
fn listed_input_name(record: &wire::ImageInList) -> String {
    if record.repo_tags.len() > 1 {
        record.repo_tags[0].clone()
    } else {
        record.id.clone()
    }
}

// =============================================================================
// RemoteRuntime
// =============================================================================

/// Runtime backed by a connection to the remote service.
///
/// The connection is owned by this value and closed by [`Runtime::shutdown`].
pub struct RemoteRuntime {
    conn: Connection,
}

impl RemoteRuntime {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Connect to the service at `address`.
    pub async fn open(address: &Address) -> Result<Self, RuntimeError> {
        let conn = Connection::open(address)
            .await
            .context(RemoteConnectSnafu)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn fetch_state(&self, id_or_name: &str) -> Result<ContainerState, ContainerError> {
        let reply: wire::StateReply = self
            .conn
            .call(wire::CONTAINER_STATE, json!({ "name": id_or_name }))
            .await
            .map_err(|e| map_container_error(e, id_or_name))?;

        serde_json::from_str(&reply.state).map_err(|e| {
            ContainerError::Format(format!("state of container {}: {}", id_or_name, e))
        })
    }

    async fn fetch_config(&self, id_or_name: &str) -> Result<ContainerConfig, ContainerError> {
        let reply: wire::ConfigReply = self
            .conn
            .call(wire::CONTAINER_CONFIG, json!({ "name": id_or_name }))
            .await
            .map_err(|e| map_container_error(e, id_or_name))?;

        serde_json::from_str(&reply.config).map_err(|e| {
            ContainerError::Format(format!("config of container {}: {}", id_or_name, e))
        })
    }
}

impl Sealed for RemoteRuntime {}

#[async_trait]
impl ImageOps for RemoteRuntime {
    async fn list_images(&self) -> Result<Vec<ContainerImage>, ImageError> {
        let reply: wire::ListImagesReply = self
            .conn
            .call(wire::LIST_IMAGES, json!({}))
            .await
            .map_err(|e| map_image_error(e, "<all>"))?;

        reply
            .images
            .into_iter()
            .map(|record| {
                let input_name = listed_input_name(&record);
                image_from_record(record, input_name)
            })
            .collect()
    }

    async fn get_image(&self, name: &str) -> Result<ContainerImage, ImageError> {
        let reply: wire::GetImageReply = self
            .conn
            .call(wire::GET_IMAGE, json!({ "name": name }))
            .await
            .map_err(|e| map_image_error(e, name))?;
        image_from_record(reply.image, name)
    }

    async fn pull_image(
        &self,
        reference: &str,
        opts: &PullOptions,
    ) -> Result<ContainerImage, ImageError> {
        let params = json!({
            "name": reference,
            "certDir": opts.cert_dir.clone().unwrap_or_default(),
            "creds": "",
            "signaturePolicyPath": opts.signature_policy_path.clone().unwrap_or_default(),
            "tlsVerify": opts.tls_verify.unwrap_or(true),
        });

        let reply: wire::PullImageReply = self
            .conn
            .call(wire::PULL_IMAGE, params)
            .await
            .map_err(|e| match map_image_error(e, reference) {
                ImageError::Runtime(msg) => ImageError::PullFailed(msg),
                other => other,
            })?;

        tracing::debug!(reference, id = %reply.id, "image pulled");
        self.get_image(&reply.id).await
    }

    async fn tag_image(&self, image: &ContainerImage, tag: &str) -> Result<(), ImageError> {
        let _: wire::ImageNameReply = self
            .conn
            .call(
                wire::TAG_IMAGE,
                json!({ "name": image.id.as_str(), "tagged": tag }),
            )
            .await
            .map_err(|e| map_image_error(e, image.id.as_str()))?;
        Ok(())
    }

    async fn remove_image(
        &self,
        image: &ContainerImage,
        force: bool,
    ) -> Result<String, ImageError> {
        let reply: wire::ImageNameReply = self
            .conn
            .call(
                wire::REMOVE_IMAGE,
                json!({ "name": image.input_name, "force": force }),
            )
            .await
            .map_err(|e| map_image_error(e, &image.input_name))?;
        Ok(reply.image)
    }

    async fn image_history(&self, image: &ContainerImage) -> Result<Vec<ImageHistory>, ImageError> {
        let reply: wire::HistoryReply = self
            .conn
            .call(wire::HISTORY_IMAGE, json!({ "name": image.input_name }))
            .await
            .map_err(|e| map_image_error(e, &image.input_name))?;

        reply.history.into_iter().map(history_from_record).collect()
    }
}

#[async_trait]
impl ContainerOps for RemoteRuntime {
    async fn list_containers(&self) -> Result<Vec<Container>, ContainerError> {
        let reply: wire::ListContainersReply = self
            .conn
            .call(wire::LIST_CONTAINERS, json!({}))
            .await
            .map_err(|e| map_container_error(e, "<all>"))?;
        Ok(reply.containers.into_iter().map(container_from_record).collect())
    }

    async fn lookup_container(&self, id_or_name: &str) -> Result<Container, ContainerError> {
        // State proves the container exists; a missing config only degrades the view.
        self.fetch_state(id_or_name).await?;

        match self.fetch_config(id_or_name).await {
            Ok(config) => {
                let id = if config.id.is_empty() {
                    id_or_name.to_string()
                } else {
                    config.id.clone()
                };
                let name = if config.name.is_empty() {
                    id_or_name.to_string()
                } else {
                    config.name.clone()
                };
                Ok(Container::new(ContainerId::new(id), name, config))
            }
            Err(e) => {
                tracing::warn!(container = id_or_name, "unable to fetch container config: {}", e);
                Ok(Container::with_degraded_config(
                    ContainerId::new(id_or_name),
                    id_or_name,
                ))
            }
        }
    }

    async fn get_latest_container(&self) -> Result<Container, ContainerError> {
        Err(ContainerError::NotImplemented(
            "latest container lookup is not supported over a remote connection".to_string(),
        ))
    }

    async fn container_state(
        &self,
        container: &Container,
    ) -> Result<ContainerState, ContainerError> {
        self.fetch_state(container.id.as_str()).await
    }

    async fn container_config(&self, id_or_name: &str) -> Result<ContainerConfig, ContainerError> {
        self.fetch_config(id_or_name).await
    }

    async fn remove_container(
        &self,
        container: &Container,
        opts: RemoveOptions,
        cancel: &CancellationToken,
    ) -> Result<(), ContainerError> {
        if cancel.is_cancelled() {
            return Err(ContainerError::Cancelled(container.id.to_string()));
        }

        let params = json!({
            "name": container.id.as_str(),
            "force": opts.force,
            "removeVolumes": opts.volumes,
        });
        let reply: wire::RemoveContainerReply = self
            .conn
            .call(wire::REMOVE_CONTAINER, params)
            .await
            .map_err(|e| map_container_error(e, container.id.as_str()))?;

        tracing::debug!(container = %reply.container, "container removed");
        Ok(())
    }

    async fn remove_containers_from_storage(
        &self,
        _ids_or_names: &[String],
    ) -> Result<(), ContainerError> {
        Err(ContainerError::NotImplemented(
            "storage cleanup is not supported over a remote connection".to_string(),
        ))
    }
}

#[async_trait]
impl Runtime for RemoteRuntime {
    fn variant(&self) -> Variant {
        Variant::Remote
    }

    async fn shutdown(&self) {
        self.conn.close().await;
    }
}
