// ABOUTME: Runtime facade: one interface over a local engine or a remote service.
// ABOUTME: The variant is chosen once at startup by connect().

mod detection;
mod error;
mod local;
mod remote;
pub mod traits;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use detection::{DetectionError, detect_local};
pub use error::RuntimeError;
pub use local::LocalRuntime;
pub use remote::RemoteRuntime;
pub use traits::*;
pub use types::{DEFAULT_REMOTE_ADDRESS, EngineConfig, RuntimeInfo, RuntimeType};

use crate::rpc::Address;
use error::RemoteConnectSnafu;
use snafu::ResultExt;

/// Select and connect the runtime described by `config`.
///
/// Callers only see the facade; nothing downstream branches on the variant.
pub async fn connect(config: &EngineConfig) -> Result<Box<dyn Runtime>, RuntimeError> {
    match config.mode {
        Variant::Local => {
            let info = detect_local(config)?;
            tracing::debug!(
                runtime = %info.runtime_type,
                socket = %info.socket_path,
                "using local engine"
            );
            Ok(Box::new(LocalRuntime::open(info).await?))
        }
        Variant::Remote => {
            let address: Address = config
                .remote_address
                .parse()
                .context(RemoteConnectSnafu)?;
            tracing::debug!(%address, "using remote service");
            Ok(Box::new(RemoteRuntime::open(&address).await?))
        }
    }
}
