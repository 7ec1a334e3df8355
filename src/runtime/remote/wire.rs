// ABOUTME: Wire records and method names of the remote service.
// ABOUTME: Also parses the service's two-token date/time strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

pub(super) const LIST_IMAGES: &str = "io.podman.ListImages";
pub(super) const GET_IMAGE: &str = "io.podman.GetImage";
pub(super) const PULL_IMAGE: &str = "io.podman.PullImage";
pub(super) const TAG_IMAGE: &str = "io.podman.TagImage";
pub(super) const REMOVE_IMAGE: &str = "io.podman.RemoveImage";
pub(super) const HISTORY_IMAGE: &str = "io.podman.HistoryImage";
pub(super) const LIST_CONTAINERS: &str = "io.podman.ListContainers";
pub(super) const CONTAINER_STATE: &str = "io.podman.ContainerStateData";
pub(super) const CONTAINER_CONFIG: &str = "io.podman.ContainerConfig";
pub(super) const REMOVE_CONTAINER: &str = "io.podman.RemoveContainer";

/// An image as listed by the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInList {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    #[serde(default)]
    pub digest: String,
    pub created: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub is_parent: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageHistoryRecord {
    pub id: String,
    pub created: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: String,
    #[serde(default)]
    pub names: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListImagesReply {
    #[serde(default)]
    pub images: Vec<ImageInList>,
}

#[derive(Debug, Deserialize)]
pub struct GetImageReply {
    pub image: ImageInList,
}

#[derive(Debug, Deserialize)]
pub struct PullImageReply {
    pub id: String,
}

/// Reply of TagImage and RemoveImage.
#[derive(Debug, Deserialize)]
pub struct ImageNameReply {
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryReply {
    #[serde(default)]
    pub history: Vec<ImageHistoryRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ListContainersReply {
    #[serde(default)]
    pub containers: Vec<ContainerRecord>,
}

/// State payload: a JSON document serialized into a string.
#[derive(Debug, Deserialize)]
pub struct StateReply {
    pub state: String,
}

/// Config payload: a JSON document serialized into a string.
#[derive(Debug, Deserialize)]
pub struct ConfigReply {
    pub config: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveContainerReply {
    pub container: String,
}

/// Parse a timestamp such as `2020-01-02 03:04:05.6789 +0000 UTC`.
///
/// Only the first two tokens are used; they are read as a UTC date and time.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let mut fields = value.split_whitespace();
    let (Some(date), Some(time)) = (fields.next(), fields.next()) else {
        return Err(format!("expected \"<date> <time>\", got {:?}", value));
    };

    DateTime::parse_from_rfc3339(&format!("{}T{}Z", date, time))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp {:?}: {}", value, e))
}
