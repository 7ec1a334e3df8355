// ABOUTME: Domain views shared by both runtime variants.
// ABOUTME: Container, ContainerImage, state/config snapshots, and operation options.

use crate::types::{ContainerId, ImageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which implementation backs a runtime handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Calls go straight to an engine on this host.
    Local,
    /// Calls are proxied over the RPC channel.
    Remote,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::Local => write!(f, "local"),
            Variant::Remote => write!(f, "remote"),
        }
    }
}

/// Read-only view of an image, built fresh for every query.
#[derive(Debug, Clone)]
pub struct ContainerImage {
    /// Image ID.
    pub id: ImageId,
    /// Repository names and tags.
    pub names: Vec<String>,
    /// Content digest, when the engine reports one.
    pub digest: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// ID of the parent image, empty when there is none.
    pub parent: String,
    /// Whether another image in the store uses this one as its parent.
    pub is_parent: bool,
    /// Image labels.
    pub labels: HashMap<String, String>,
    /// The name this image was looked up by. Remote calls address it this way.
    pub input_name: String,
}

impl ContainerImage {
    /// An image with no names left is dangling.
    pub fn is_dangling(&self) -> bool {
        self.names.is_empty()
    }

    /// First name, or `<none>` for dangling images.
    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("<none>")
    }
}

/// One layer in an image's history.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHistory {
    pub id: String,
    pub created: DateTime<Utc>,
    pub created_by: String,
    pub size: i64,
    pub comment: String,
}

/// Lifecycle status of a container as reported by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Configured,
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Stopped,
    Exited,
    Dead,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ContainerStatus {
    /// Statuses a waiter has to keep polling through.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ContainerStatus::Running | ContainerStatus::Paused | ContainerStatus::Restarting
        )
    }
}

/// Point-in-time state of a container. Never cached on a [`Container`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerState {
    #[serde(rename = "state")]
    pub status: ContainerStatus,
    pub exit_code: i32,
    pub pid: i64,
}

/// Immutable configuration captured when a container is looked up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerConfig {
    pub id: String,
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub command: Vec<String>,
}

/// Read-only view of a container.
///
/// The view does not own the container and goes stale as soon as it is
/// returned; fetch state through the runtime whenever it matters.
#[derive(Debug, Clone)]
pub struct Container {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Configuration snapshot.
    pub config: ContainerConfig,
    config_degraded: bool,
}

impl Container {
    pub fn new(id: ContainerId, name: impl Into<String>, config: ContainerConfig) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            config_degraded: false,
        }
    }

    /// Build a view whose configuration could not be fetched.
    pub fn with_degraded_config(id: ContainerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            config: ContainerConfig::default(),
            config_degraded: true,
        }
    }

    /// True when `config` is a placeholder rather than the engine's record.
    pub fn is_config_degraded(&self) -> bool {
        self.config_degraded
    }
}

/// Flags for container removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove even if the container is running.
    pub force: bool,
    /// Also remove anonymous volumes attached to the container.
    pub volumes: bool,
}

/// Options forwarded to the engine when pulling an image.
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Path to a signature policy file.
    pub signature_policy_path: Option<String>,
    /// Directory holding registry certificates.
    pub cert_dir: Option<String>,
    /// Verify registry TLS certificates. `None` uses the engine default.
    pub tls_verify: Option<bool>,
}
