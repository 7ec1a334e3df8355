// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Global engine/worker flags plus the rm, wait, and image subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "Manage containers and images on a local or remote engine")]
#[command(version)]
pub struct Cli {
    /// Path to a config file (default: discover stevedore.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Talk to the remote service instead of the local engine
    #[arg(long, global = true)]
    pub remote: bool,

    /// Remote service address, unix:<path> or tcp:<host>:<port> (implies --remote)
    #[arg(long, global = true, value_name = "ADDR")]
    pub remote_address: Option<String>,

    /// Maximum number of concurrent operations for batch commands
    #[arg(long, global = true, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Log filter, e.g. warn, debug, stevedore=trace
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove one or more containers
    Rm {
        /// Remove all containers
        #[arg(short, long)]
        all: bool,

        /// Force removal of running containers
        #[arg(short, long)]
        force: bool,

        /// Act on the latest container
        #[arg(short, long)]
        latest: bool,

        /// Remove anonymous volumes attached to the containers
        #[arg(short, long)]
        volumes: bool,

        containers: Vec<String>,
    },

    /// Block until containers stop, then print their exit codes
    Wait {
        /// Milliseconds between state polls (default 250)
        #[arg(short, long, value_name = "MS")]
        interval: Option<u64>,

        /// Act on the latest container
        #[arg(short, long)]
        latest: bool,

        containers: Vec<String>,
    },

    /// List images
    Images,

    /// Show the layer history of an image
    History { image: String },

    /// Pull an image
    Pull {
        image: String,

        /// Directory with registry certificates
        #[arg(long, value_name = "DIR")]
        cert_dir: Option<String>,

        /// Signature policy file
        #[arg(long, value_name = "PATH")]
        signature_policy: Option<String>,

        /// Verify registry TLS certificates
        #[arg(long, value_name = "BOOL")]
        tls_verify: Option<bool>,
    },

    /// Add names to an image
    Tag {
        image: String,

        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Remove one or more images
    Rmi {
        /// Remove even if containers use the image
        #[arg(short, long)]
        force: bool,

        #[arg(required = true)]
        images: Vec<String>,
    },
}
