// ABOUTME: Entry point for the stevedore CLI application.
// ABOUTME: Validates arguments, connects the runtime once, dispatches, and shuts down.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::time::Duration;
use stevedore::commands::{self, DEFAULT_WAIT_INTERVAL, Plan, RmArgs, WaitArgs};
use stevedore::config::Config;
use stevedore::error::Result;
use stevedore::output::Output;
use stevedore::runtime::{self, PullOptions, Variant};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::terminal();
    if let Err(e) = run(cli, &output).await {
        if !e.is_reported() {
            output.error(&e.to_string());
        }
        std::process::exit(1);
    }
}

/// Build the plan and reject bad arguments before anything connects.
fn plan_from_command(command: Commands) -> Result<Plan> {
    let plan = match command {
        Commands::Rm {
            all,
            force,
            latest,
            volumes,
            containers,
        } => {
            let args = RmArgs {
                all,
                force,
                latest,
                volumes,
                names: containers,
            };
            args.validate()?;
            Plan::Rm(args)
        }
        Commands::Wait {
            interval,
            latest,
            containers,
        } => {
            let args = WaitArgs {
                interval: interval
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_WAIT_INTERVAL),
                latest,
                names: containers,
            };
            args.validate()?;
            Plan::Wait {
                args,
                interval_set: interval.is_some(),
            }
        }
        Commands::Images => Plan::Images,
        Commands::History { image } => Plan::History(image),
        Commands::Pull {
            image,
            cert_dir,
            signature_policy,
            tls_verify,
        } => Plan::Pull(
            image,
            PullOptions {
                signature_policy_path: signature_policy,
                cert_dir,
                tls_verify,
            },
        ),
        Commands::Tag { image, targets } => Plan::Tag(image, targets),
        Commands::Rmi { images, force } => Plan::Rmi {
            names: images,
            force,
        },
    };
    Ok(plan)
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let plan = plan_from_command(cli.command)?;

    let cwd = std::env::current_dir()?;
    let mut config = Config::resolve(cli.config.as_deref(), &cwd)?;
    if let Some(address) = cli.remote_address {
        config.engine.remote_address = address;
        config.engine.mode = Variant::Remote;
    }
    if cli.remote {
        config.engine.mode = Variant::Remote;
    }
    let max_workers = cli.max_workers.or(config.max_workers);

    let runtime = runtime::connect(&config.engine).await?;
    tracing::debug!(variant = %runtime.variant(), "runtime ready");

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling outstanding work");
                cancel.cancel();
            }
        })
    };

    let result =
        commands::execute(runtime.as_ref(), plan, &config, max_workers, &cancel, output).await;
    interrupt.abort();
    result
}
