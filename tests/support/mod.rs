// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and local engine discovery for integration tests.

use std::sync::Once;
use stevedore::runtime::{EngineConfig, LocalRuntime, detect_local};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("stevedore=debug".parse().unwrap())
            .add_directive("bollard=info".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Connect to the engine on this host, if there is one.
#[allow(dead_code)]
pub async fn local_runtime() -> Option<LocalRuntime> {
    let info = detect_local(&EngineConfig::default()).ok()?;
    LocalRuntime::open(info).await.ok()
}
