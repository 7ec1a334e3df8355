// ABOUTME: Local runtime variant backed by the engine on this host via bollard.
// ABOUTME: Works with Docker and Podman through the Docker-compatible API.

use crate::runtime::error::RuntimeError;
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    Container, ContainerConfig, ContainerError, ContainerImage, ContainerOps, ContainerState,
    ContainerStatus, ImageError, ImageHistory, ImageOps, PullOptions, RemoveOptions, Runtime,
    Variant,
};
use crate::runtime::types::{RuntimeInfo, RuntimeType};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, ImageInspect, ImageSummary,
};
use bollard::query_parameters::{
    CreateImageOptions, InspectContainerOptions, ListContainersOptions, ListImagesOptions,
    RemoveContainerOptions, RemoveImageOptions, TagImageOptions,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn is_transport_error(e: &bollard::errors::Error) -> bool {
    matches!(e, bollard::errors::Error::IOError { .. })
}

fn map_container_error(e: bollard::errors::Error, subject: &str) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ContainerError::NotFound(subject.to_string())
        }
        _ if is_transport_error(&e) => ContainerError::Connectivity(e.to_string()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

/// Only the "container is running" conflict maps to `Running`; other 409s,
/// such as a removal already in progress, are engine errors.
fn map_container_remove_error(e: bollard::errors::Error, subject: &str) -> ContainerError {
    if let bollard::errors::Error::DockerResponseServerError {
        status_code: 409,
        message,
    } = &e
    {
        if message.to_lowercase().contains("running") {
            return ContainerError::Running(subject.to_string());
        }
        return ContainerError::Runtime(format!("{}: {}", subject, message));
    }
    map_container_error(e, subject)
}

fn map_image_error(e: bollard::errors::Error, subject: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(subject.to_string())
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ImageError::InUse(format!("{}: {}", subject, message)),
        _ if is_transport_error(&e) => ImageError::Connectivity(e.to_string()),
        _ => ImageError::Runtime(format!("{}: {}", subject, e)),
    }
}

const CLOSED: &str = "runtime has been shut down";

// =============================================================================
// Conversions
// =============================================================================

fn status_from_engine(status: Option<ContainerStateStatusEnum>) -> ContainerStatus {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    }
}

fn state_from_inspect(details: &ContainerInspectResponse) -> ContainerState {
    let state = details.state.as_ref();
    ContainerState {
        status: status_from_engine(state.and_then(|s| s.status)),
        exit_code: state
            .and_then(|s| s.exit_code)
            .map(|code| i32::try_from(code).unwrap_or(i32::MAX))
            .unwrap_or_default(),
        pid: state.and_then(|s| s.pid).unwrap_or_default(),
    }
}

fn config_from_inspect(details: &ContainerInspectResponse) -> ContainerConfig {
    let config = details.config.as_ref();
    ContainerConfig {
        id: details.id.clone().unwrap_or_default(),
        name: details
            .name
            .as_deref()
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string(),
        image: config.and_then(|c| c.image.clone()).unwrap_or_default(),
        labels: config.and_then(|c| c.labels.clone()).unwrap_or_default(),
        command: config.and_then(|c| c.cmd.clone()).unwrap_or_default(),
    }
}

fn image_from_summary(
    summary: &ImageSummary,
    is_parent: bool,
    input_name: String,
) -> Result<ContainerImage, ImageError> {
    let created = DateTime::<Utc>::from_timestamp(summary.created, 0).ok_or_else(|| {
        ImageError::Format(format!(
            "image {} has invalid creation time {}",
            summary.id, summary.created
        ))
    })?;

    let digest = summary
        .repo_digests
        .first()
        .and_then(|d| d.split_once('@'))
        .map(|(_, digest)| digest.to_string());

    Ok(ContainerImage {
        id: ImageId::new(summary.id.clone()),
        names: summary.repo_tags.clone(),
        digest,
        size: u64::try_from(summary.size).unwrap_or_default(),
        created,
        parent: summary.parent_id.clone(),
        is_parent,
        labels: summary.labels.clone(),
        input_name,
    })
}

/// Build an image from the engine's inspect record. The engine resolves the
/// name (short, fully-qualified, ID prefix or digest); `parent` comes from the
/// image list because inspect no longer reports it.
fn image_from_inspect(
    details: ImageInspect,
    parent: String,
    is_parent: bool,
    input_name: String,
) -> Result<ContainerImage, ImageError> {
    let id = details
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ImageError::Format(format!("image {} has no id", input_name)))?;

    let created = match details.created {
        Some(created) => DateTime::<Utc>::from_timestamp(created.unix_timestamp(), 0)
            .ok_or_else(|| {
                ImageError::Format(format!("image {} has invalid creation time", id))
            })?,
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    let repo_digests = details.repo_digests.unwrap_or_default();
    let digest = repo_digests
        .first()
        .and_then(|d| d.split_once('@'))
        .map(|(_, digest)| digest.to_string());

    Ok(ContainerImage {
        id: ImageId::new(id),
        names: details.repo_tags.unwrap_or_default(),
        digest,
        size: details
            .size
            .and_then(|size| u64::try_from(size).ok())
            .unwrap_or_default(),
        created,
        parent,
        is_parent,
        labels: details
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default(),
        input_name,
    })
}

fn split_tag(target: &str) -> (&str, &str) {
    match target.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, tag),
        _ => (target, "latest"),
    }
}

// =============================================================================
// LocalRuntime
// =============================================================================

/// Runtime that talks to the engine on this host.
pub struct LocalRuntime {
    client: RwLock<Option<Docker>>,
    info: RuntimeInfo,
}

impl LocalRuntime {
    pub fn new(client: Docker, info: RuntimeInfo) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            info,
        }
    }

    /// Connect to a detected engine and check that it answers.
    pub async fn open(info: RuntimeInfo) -> Result<Self, RuntimeError> {
        let connect_failed = |message: String| RuntimeError::LocalConnect {
            socket: info.socket_path.clone(),
            message,
        };

        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| connect_failed(e.to_string()))?;
        client
            .ping()
            .await
            .map_err(|e| connect_failed(e.to_string()))?;

        tracing::debug!(
            runtime = %info.runtime_type,
            socket = %info.socket_path,
            "connected to local engine"
        );
        Ok(Self::new(client, info))
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.info.runtime_type
    }

    fn container_client(&self) -> Result<Docker, ContainerError> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| ContainerError::Connectivity(CLOSED.to_string()))
    }

    fn image_client(&self) -> Result<Docker, ImageError> {
        self.client
            .read()
            .clone()
            .ok_or_else(|| ImageError::Connectivity(CLOSED.to_string()))
    }

    async fn inspect(&self, id_or_name: &str) -> Result<ContainerInspectResponse, ContainerError> {
        self.container_client()?
            .inspect_container(id_or_name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| map_container_error(e, id_or_name))
    }

    async fn image_summaries(&self) -> Result<Vec<ImageSummary>, ImageError> {
        self.image_client()?
            .list_images(Some(ListImagesOptions::default()))
            .await
            .map_err(|e| map_image_error(e, "image list"))
    }

    async fn container_summaries(
        &self,
    ) -> Result<Vec<bollard::models::ContainerSummary>, ContainerError> {
        let client = self.container_client()?;
        let opts = ListContainersOptions {
            all: true,
            ..Default::default()
        };

        // Podman reports a transient "stopping" state that bollard cannot
        // deserialize; it clears within a moment.
        let mut last_error = None;
        for attempt in 0..3 {
            match client.list_containers(Some(opts.clone())).await {
                Ok(containers) => return Ok(containers),
                Err(e) => {
                    let err_str = e.to_string();
                    if (err_str.contains("unknown variant `stopping`")
                        || err_str.contains("unknown variant `stopped`"))
                        && attempt < 2
                    {
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        last_error = Some(err_str);
                        continue;
                    }
                    return Err(map_container_error(e, "container list"));
                }
            }
        }

        Err(ContainerError::Runtime(
            last_error.unwrap_or_else(|| "list_containers failed".to_string()),
        ))
    }

    async fn force_remove(&self, id_or_name: &str) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.container_client()?
            .remove_container(id_or_name, Some(opts))
            .await
            .map_err(|e| map_container_error(e, id_or_name))
    }
}

impl Sealed for LocalRuntime {}

#[async_trait]
impl ImageOps for LocalRuntime {
    async fn list_images(&self) -> Result<Vec<ContainerImage>, ImageError> {
        let summaries = self.image_summaries().await?;
        let parents: HashSet<&str> = summaries
            .iter()
            .map(|s| s.parent_id.as_str())
            .filter(|p| !p.is_empty())
            .collect();

        summaries
            .iter()
            .map(|s| {
                let name = s.repo_tags.first().cloned().unwrap_or_else(|| s.id.clone());
                image_from_summary(s, parents.contains(s.id.as_str()), name)
            })
            .collect()
    }

    async fn get_image(&self, name: &str) -> Result<ContainerImage, ImageError> {
        let details = self
            .image_client()?
            .inspect_image(name)
            .await
            .map_err(|e| map_image_error(e, name))?;
        let id = details.id.clone().unwrap_or_default();

        let summaries = self.image_summaries().await?;
        let is_parent = summaries.iter().any(|s| s.parent_id == id);
        let parent = summaries
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.parent_id.clone())
            .unwrap_or_default();

        image_from_inspect(details, parent, is_parent, name.to_string())
    }

    async fn pull_image(
        &self,
        reference: &str,
        opts: &PullOptions,
    ) -> Result<ContainerImage, ImageError> {
        if opts.signature_policy_path.is_some() || opts.cert_dir.is_some() {
            tracing::debug!("signature policy and cert dir are managed by the local engine");
        }

        let create_opts = CreateImageOptions {
            from_image: Some(reference.to_string()),
            ..Default::default()
        };

        let mut stream = self
            .image_client()?
            .create_image(Some(create_opts), None, None);
        while let Some(result) = stream.next().await {
            result.map_err(|e| ImageError::PullFailed(format!("{}: {}", reference, e)))?;
        }

        self.get_image(reference).await
    }

    async fn tag_image(&self, image: &ContainerImage, tag: &str) -> Result<(), ImageError> {
        let (repo, tag_part) = split_tag(tag);
        let opts = TagImageOptions {
            repo: Some(repo.to_string()),
            tag: Some(tag_part.to_string()),
        };

        self.image_client()?
            .tag_image(image.id.as_str(), Some(opts))
            .await
            .map_err(|e| map_image_error(e, &image.input_name))
    }

    async fn remove_image(
        &self,
        image: &ContainerImage,
        force: bool,
    ) -> Result<String, ImageError> {
        let opts = RemoveImageOptions {
            force,
            ..Default::default()
        };

        let items = self
            .image_client()?
            .remove_image(&image.input_name, Some(opts), None)
            .await
            .map_err(|e| map_image_error(e, &image.input_name))?;

        let removed = items
            .iter()
            .find_map(|i| i.deleted.clone())
            .or_else(|| items.iter().find_map(|i| i.untagged.clone()))
            .unwrap_or_else(|| image.id.to_string());
        Ok(removed)
    }

    async fn image_history(&self, image: &ContainerImage) -> Result<Vec<ImageHistory>, ImageError> {
        let items = self
            .image_client()?
            .image_history(&image.input_name)
            .await
            .map_err(|e| map_image_error(e, &image.input_name))?;

        items
            .into_iter()
            .map(|h| {
                let created = DateTime::<Utc>::from_timestamp(h.created, 0).ok_or_else(|| {
                    ImageError::Format(format!("layer {} has invalid creation time", h.id))
                })?;
                Ok(ImageHistory {
                    id: h.id,
                    created,
                    created_by: h.created_by,
                    size: h.size,
                    comment: h.comment,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ContainerOps for LocalRuntime {
    async fn list_containers(&self) -> Result<Vec<Container>, ContainerError> {
        let summaries = self.container_summaries().await?;

        Ok(summaries
            .into_iter()
            .map(|c| {
                let id = c.id.unwrap_or_default();
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let config = ContainerConfig {
                    id: id.clone(),
                    name: name.clone(),
                    image: c.image.unwrap_or_default(),
                    labels: c.labels.unwrap_or_default(),
                    command: c.command.into_iter().collect(),
                };
                Container::new(ContainerId::new(id), name, config)
            })
            .collect())
    }

    async fn lookup_container(&self, id_or_name: &str) -> Result<Container, ContainerError> {
        let details = self.inspect(id_or_name).await?;
        let config = config_from_inspect(&details);
        Ok(Container::new(
            ContainerId::new(config.id.clone()),
            config.name.clone(),
            config,
        ))
    }

    async fn get_latest_container(&self) -> Result<Container, ContainerError> {
        let latest = self
            .container_summaries()
            .await?
            .into_iter()
            .max_by_key(|c| c.created.unwrap_or_default())
            .and_then(|c| c.id)
            .ok_or_else(|| ContainerError::NotFound("no containers exist".to_string()))?;

        self.lookup_container(&latest).await
    }

    async fn container_state(
        &self,
        container: &Container,
    ) -> Result<ContainerState, ContainerError> {
        let details = self.inspect(container.id.as_str()).await?;
        Ok(state_from_inspect(&details))
    }

    async fn container_config(&self, id_or_name: &str) -> Result<ContainerConfig, ContainerError> {
        let details = self.inspect(id_or_name).await?;
        Ok(config_from_inspect(&details))
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

        let remove_opts = RemoveContainerOptions {
            force: opts.force,
            v: opts.volumes,
            ..Default::default()
        };

        self.container_client()?
            .remove_container(container.id.as_str(), Some(remove_opts))
            .await
            .map_err(|e| map_container_remove_error(e, container.id.as_str()))
    }

    async fn remove_containers_from_storage(
        &self,
        ids_or_names: &[String],
    ) -> Result<(), ContainerError> {
        let mut not_found = None;
        let mut failure = None;

        for id in ids_or_names {
            match self.force_remove(id).await {
                Ok(()) => tracing::debug!(container = %id, "removed from storage"),
                Err(e @ ContainerError::NotFound(_)) => not_found = Some(e),
                Err(e) => {
                    tracing::warn!(container = %id, "storage cleanup failed: {}", e);
                    failure = Some(e);
                }
            }
        }

        match failure.or(not_found) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Runtime for LocalRuntime {
    fn variant(&self) -> Variant {
        Variant::Local
    }

    async fn shutdown(&self) {
        if self.client.write().take().is_some() {
            tracing::debug!(socket = %self.info.socket_path, "local engine connection released");
        }
    }
}
