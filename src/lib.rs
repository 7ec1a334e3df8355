// ABOUTME: Library root for stevedore - runtime facade, worker pool, and commands.
// ABOUTME: The main binary is in main.rs.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod pool;
pub mod rpc;
pub mod runtime;
pub mod types;
