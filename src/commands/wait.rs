// ABOUTME: Wait orchestrator: block on containers one at a time and print exit codes.
// ABOUTME: Failures are flushed to stderr one step late; the last one is the result.

use crate::error::{Error, ErrorKind, Result};
use crate::output::Output;
use crate::runtime::Runtime;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// Arguments of `wait`.
#[derive(Debug, Clone)]
pub struct WaitArgs {
    pub interval: Duration,
    pub latest: bool,
    pub names: Vec<String>,
}

impl Default for WaitArgs {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WAIT_INTERVAL,
            latest: false,
            names: Vec::new(),
        }
    }
}

impl WaitArgs {
    pub fn validate(&self) -> Result<()> {
        if self.names.is_empty() && !self.latest {
            return Err(Error::InvalidArgument(
                "you must provide at least one container name or id".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidArgument(
                "interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A failure waiting to be reported, and whether stderr has seen it already.
struct Pending {
    error: Error,
    shown: bool,
}

/// Wait for each target to stop, strictly in order, printing its exit code.
///
/// A lookup failure is printed as soon as it happens. Any other failure is
/// held back and printed only when the next failure replaces it. The result
/// is the most recent failure.
pub async fn wait(
    runtime: &dyn Runtime,
    args: &WaitArgs,
    cancel: &CancellationToken,
    out: &Output,
) -> Result<()> {
    args.validate()?;

    let mut targets = args.names.clone();
    if args.latest {
        let latest = runtime
            .get_latest_container()
            .await
            .map_err(Error::Latest)?;
        targets.push(latest.id.to_string());
    }

    let mut pending: Option<Pending> = None;
    for name in &targets {
        let failure = match runtime.lookup_container(name).await {
            Err(source) => {
                let error = Error::Lookup {
                    name: name.clone(),
                    source,
                };
                out.diagnostic(&error.to_string());
                Pending { error, shown: true }
            }
            Ok(container) => match runtime.wait_for_exit(&container, args.interval, cancel).await {
                Ok(code) => {
                    out.line(&code.to_string());
                    continue;
                }
                Err(source) => Pending {
                    error: Error::Wait {
                        name: name.clone(),
                        source,
                    },
                    shown: false,
                },
            },
        };

        if let Some(previous) = pending.take()
            && !previous.shown
        {
            out.diagnostic(&previous.error.to_string());
        }
        let cancelled = failure.error.kind() == ErrorKind::Cancelled;
        pending = Some(failure);
        if cancelled {
            tracing::debug!("wait cancelled, skipping remaining containers");
            break;
        }
    }

    match pending {
        Some(Pending { error, shown: true }) => Err(Error::Reported(Box::new(error))),
        Some(Pending { error, .. }) => Err(error),
        None => Ok(()),
    }
}
