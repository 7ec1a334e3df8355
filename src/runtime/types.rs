// ABOUTME: Engine selection types: local engine flavor and connection settings.
// ABOUTME: EngineConfig is read from the config file and picks the runtime variant.

use super::traits::Variant;
use serde::{Deserialize, Serialize};

/// Default address of the remote varlink service.
pub const DEFAULT_REMOTE_ADDRESS: &str = "unix:/run/podman/io.podman";

/// Flavor of the local container engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "docker"),
            RuntimeType::Podman => write!(f, "podman"),
        }
    }
}

/// A detected local engine.
#[derive(Debug, Clone)]
pub struct RuntimeInfo {
    pub runtime_type: RuntimeType,
    pub socket_path: String,
}

/// How to reach the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Local or remote execution.
    pub mode: Variant,
    /// Local engine flavor (overrides auto-detection).
    pub runtime: Option<RuntimeType>,
    /// Local engine socket (overrides auto-detection).
    pub socket: Option<String>,
    /// Address of the remote service, `unix:<path>` or `tcp:<host>:<port>`.
    pub remote_address: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Variant::Local,
            runtime: None,
            socket: None,
            remote_address: DEFAULT_REMOTE_ADDRESS.to_string(),
        }
    }
}
