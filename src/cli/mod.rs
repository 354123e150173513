//! CLI module for the store cache node
//!
//! - `serve`: run a cache node until interrupted
//! - `purge`: broadcast a cluster-wide purge and exit

pub mod purge;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Store Cache - cluster-coherent read-through cache for entity stores
#[derive(Parser)]
#[command(name = "pmp-store-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a cache node
    Serve,

    /// Purge named caches on every node of the cluster
    Purge(purge::PurgeArgs),
}
