use clap::Parser;
use pmp_store_cache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Purge(args) => cli::purge::run(args).await,
    }
}
