// ABOUTME: In-memory runtime used by orchestrator tests.
// ABOUTME: Scripted container states and failures, with a record of every call.

use super::traits::sealed::Sealed;
use super::traits::{
    Container, ContainerConfig, ContainerError, ContainerImage, ContainerOps, ContainerState,
    ContainerStatus, ImageError, ImageHistory, ImageOps, PullOptions, RemoveOptions, Runtime,
    Variant,
};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type MakeError = fn(String) -> ContainerError;

struct FakeContainer {
    container: Container,
    /// Successive answers to state polls; the last one repeats.
    states: VecDeque<Result<ContainerState, MakeError>>,
    remove_error: Option<MakeError>,
    remove_delay: Duration,
}

#[derive(Default)]
pub(crate) struct FakeRuntime {
    containers: Mutex<Vec<FakeContainer>>,
    images: Mutex<Vec<ContainerImage>>,
    latest: Option<String>,
    storage_error: Option<MakeError>,
    lookups: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
    storage_removed: Mutex<Vec<String>>,
    tags: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    shutdowns: AtomicUsize,
}

pub(crate) fn exited(code: i32) -> ContainerState {
    ContainerState {
        status: ContainerStatus::Exited,
        exit_code: code,
        pid: 0,
    }
}

pub(crate) fn running() -> ContainerState {
    ContainerState {
        status: ContainerStatus::Running,
        exit_code: 0,
        pid: 42,
    }
}

pub(crate) fn image(id: &str, names: &[&str]) -> ContainerImage {
    ContainerImage {
        id: ImageId::new(id),
        names: names.iter().map(|n| n.to_string()).collect(),
        digest: None,
        size: 1_048_576,
        created: chrono::DateTime::from_timestamp(1_577_836_800, 0).unwrap_or_default(),
        parent: String::new(),
        is_parent: false,
        labels: HashMap::new(),
        input_name: id.to_string(),
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container that has already exited with code 0.
    pub fn with_container(self, id: &str, name: &str) -> Self {
        let config = ContainerConfig {
            id: id.to_string(),
            name: name.to_string(),
            image: "alpine".to_string(),
            ..ContainerConfig::default()
        };
        self.containers.lock().push(FakeContainer {
            container: Container::new(ContainerId::new(id), name, config),
            states: VecDeque::from([Ok(exited(0))]),
            remove_error: None,
            remove_delay: Duration::ZERO,
        });
        self
    }

    pub fn with_states(self, id: &str, states: Vec<ContainerState>) -> Self {
        self.edit(id, |c| c.states = states.into_iter().map(Ok).collect());
        self
    }

    pub fn failing_state(self, id: &str, make: MakeError) -> Self {
        self.edit(id, |c| c.states = VecDeque::from([Err(make)]));
        self
    }

    pub fn failing_removal(self, id: &str, make: MakeError) -> Self {
        self.edit(id, |c| c.remove_error = Some(make));
        self
    }

    pub fn slow_removal(self, id: &str, delay: Duration) -> Self {
        self.edit(id, |c| c.remove_delay = delay);
        self
    }

    pub fn with_latest(mut self, id: &str) -> Self {
        self.latest = Some(id.to_string());
        self
    }

    pub fn failing_storage_removal(mut self, make: MakeError) -> Self {
        self.storage_error = Some(make);
        self
    }

    pub fn with_image(self, image: ContainerImage) -> Self {
        self.images.lock().push(image);
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }

    pub fn storage_removed(&self) -> Vec<String> {
        self.storage_removed.lock().clone()
    }

    pub fn tags(&self) -> Vec<(String, String)> {
        self.tags.lock().clone()
    }

    pub fn image_ids(&self) -> Vec<String> {
        self.images.lock().iter().map(|i| i.id.to_string()).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn edit(&self, id: &str, f: impl FnOnce(&mut FakeContainer)) {
        if let Some(c) = self
            .containers
            .lock()
            .iter_mut()
            .find(|c| c.container.id.as_str() == id)
        {
            f(c);
        }
    }

    fn find(&self, id_or_name: &str) -> Option<Container> {
        self.containers
            .lock()
            .iter()
            .find(|c| c.container.name == id_or_name || c.container.id.matches(id_or_name))
            .map(|c| c.container.clone())
    }

    fn find_image(&self, name: &str) -> Option<ContainerImage> {
        self.images
            .lock()
            .iter()
            .find(|i| i.id.matches(name) || i.names.iter().any(|n| n == name))
            .cloned()
            .map(|mut i| {
                i.input_name = name.to_string();
                i
            })
    }
}

impl Sealed for FakeRuntime {}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn list_containers(&self) -> Result<Vec<Container>, ContainerError> {
        Ok(self
            .containers
            .lock()
            .iter()
            .map(|c| c.container.clone())
            .collect())
    }

    async fn lookup_container(&self, id_or_name: &str) -> Result<Container, ContainerError> {
        self.lookups.lock().push(id_or_name.to_string());
        self.find(id_or_name)
            .ok_or_else(|| ContainerError::NotFound(id_or_name.to_string()))
    }

    async fn get_latest_container(&self) -> Result<Container, ContainerError> {
        let id = self
            .latest
            .clone()
            .ok_or_else(|| ContainerError::NotFound("no containers".to_string()))?;
        self.lookup_container(&id).await
    }

    async fn container_state(
        &self,
        container: &Container,
    ) -> Result<ContainerState, ContainerError> {
        let mut containers = self.containers.lock();
        let fake = containers
            .iter_mut()
            .find(|c| c.container.id == container.id)
            .ok_or_else(|| ContainerError::NotFound(container.id.to_string()))?;

        let next = if fake.states.len() > 1 {
            fake.states.pop_front()
        } else {
            fake.states.front().cloned()
        };
        match next {
            Some(Ok(state)) => Ok(state),
            Some(Err(make)) => Err(make(container.id.to_string())),
            None => Ok(ContainerState::default()),
        }
    }

    async fn container_config(&self, id_or_name: &str) -> Result<ContainerConfig, ContainerError> {
        self.find(id_or_name)
            .map(|c| c.config)
            .ok_or_else(|| ContainerError::NotFound(id_or_name.to_string()))
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

        let (delay, failure) = {
            let containers = self.containers.lock();
            let fake = containers
                .iter()
                .find(|c| c.container.id == container.id)
                .ok_or_else(|| ContainerError::NotFound(container.id.to_string()))?;
            (fake.remove_delay, fake.remove_error)
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(make) = failure {
            return Err(make(container.id.to_string()));
        }
        if !opts.force
            && self
                .containers
                .lock()
                .iter()
                .find(|c| c.container.id == container.id)
                .and_then(|c| c.states.front())
                .is_some_and(|s| matches!(s, Ok(state) if state.status.is_active()))
        {
            return Err(ContainerError::Running(container.id.to_string()));
        }

        self.containers
            .lock()
            .retain(|c| c.container.id != container.id);
        self.removed.lock().push(container.id.to_string());
        Ok(())
    }

    async fn remove_containers_from_storage(
        &self,
        ids_or_names: &[String],
    ) -> Result<(), ContainerError> {
        self.storage_removed
            .lock()
            .extend(ids_or_names.iter().cloned());
        match self.storage_error {
            Some(make) => Err(make(ids_or_names.join(", "))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn list_images(&self) -> Result<Vec<ContainerImage>, ImageError> {
        Ok(self.images.lock().clone())
    }

    async fn get_image(&self, name: &str) -> Result<ContainerImage, ImageError> {
        self.find_image(name)
            .ok_or_else(|| ImageError::NotFound(name.to_string()))
    }

    async fn pull_image(
        &self,
        reference: &str,
        _opts: &PullOptions,
    ) -> Result<ContainerImage, ImageError> {
        if let Some(existing) = self.find_image(reference) {
            return Ok(existing);
        }
        let pulled = image(&format!("sha256:{:0>12}", self.images.lock().len()), &[reference]);
        self.images.lock().push(pulled.clone());
        Ok(pulled)
    }

    async fn tag_image(&self, image: &ContainerImage, tag: &str) -> Result<(), ImageError> {
        let mut images = self.images.lock();
        let stored = images
            .iter_mut()
            .find(|i| i.id == image.id)
            .ok_or_else(|| ImageError::NotFound(image.id.to_string()))?;
        stored.names.push(tag.to_string());
        self.tags
            .lock()
            .push((image.id.to_string(), tag.to_string()));
        Ok(())
    }

    async fn remove_image(
        &self,
        image: &ContainerImage,
        _force: bool,
    ) -> Result<String, ImageError> {
        let mut images = self.images.lock();
        let before = images.len();
        images.retain(|i| i.id != image.id);
        if images.len() == before {
            return Err(ImageError::NotFound(image.input_name.clone()));
        }
        Ok(image.id.to_string())
    }

    async fn image_history(&self, image: &ContainerImage) -> Result<Vec<ImageHistory>, ImageError> {
        Ok(vec![ImageHistory {
            id: image.id.to_string(),
            created: image.created,
            created_by: "/bin/sh -c #(nop) CMD [\"sh\"]".to_string(),
            size: 0,
            comment: String::new(),
        }])
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn variant(&self) -> Variant {
        Variant::Local
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
