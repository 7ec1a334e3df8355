// ABOUTME: Command handlers for the stevedore CLI.
// ABOUTME: Batch orchestrators (rm, wait), image commands, and the dispatcher that owns shutdown.

pub mod images;
mod rm;
mod wait;

pub use rm::{RmArgs, rm};
pub use wait::{DEFAULT_WAIT_INTERVAL, WaitArgs, wait};

use crate::config::Config;
use crate::error::Result;
use crate::output::Output;
use crate::pool::{Job, WorkerPool};
use crate::runtime::{PullOptions, Runtime};
use tokio_util::sync::CancellationToken;

/// A parsed and validated command, ready to run against a runtime.
#[derive(Debug, Clone)]
pub enum Plan {
    Rm(RmArgs),
    /// `interval_set` records whether an interval was given on the command line.
    Wait { args: WaitArgs, interval_set: bool },
    Images,
    History(String),
    Pull(String, PullOptions),
    Tag(String, Vec<String>),
    Rmi { names: Vec<String>, force: bool },
}

/// Run `plan` and then release the runtime, exactly once, whatever the outcome.
pub async fn execute(
    runtime: &dyn Runtime,
    plan: Plan,
    config: &Config,
    max_workers: Option<usize>,
    cancel: &CancellationToken,
    out: &Output,
) -> Result<()> {
    let result = dispatch(runtime, plan, config, max_workers, cancel, out).await;
    runtime.shutdown().await;
    result
}

async fn dispatch(
    runtime: &dyn Runtime,
    plan: Plan,
    config: &Config,
    max_workers: Option<usize>,
    cancel: &CancellationToken,
    out: &Output,
) -> Result<()> {
    match plan {
        Plan::Rm(args) => {
            let pool = WorkerPool::for_job(Job::RemoveContainers, max_workers);
            rm(runtime, &args, pool, cancel, out).await
        }
        Plan::Wait {
            mut args,
            interval_set,
        } => {
            if !interval_set {
                args.interval = config.wait_interval;
            }
            wait(runtime, &args, cancel, out).await
        }
        Plan::Images => images::images(runtime, out).await,
        Plan::History(name) => images::history(runtime, &name, out).await,
        Plan::Pull(reference, opts) => images::pull(runtime, &reference, &opts, out).await,
        Plan::Tag(name, targets) => images::tag(runtime, &name, &targets).await,
        Plan::Rmi { names, force } => {
            let pool = WorkerPool::for_job(Job::RemoveImages, max_workers);
            images::rmi(runtime, &names, force, pool, out).await
        }
    }
}
