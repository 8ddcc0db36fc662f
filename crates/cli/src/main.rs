use anyhow::Result;
use clap::Parser;

use gantry::cli::{CacheCommands, Commands, Gantry};
use gantry::commands::{cache_clear_command, infer_command};

fn main() -> Result<()> {
    // Initialize tracing based on RUST_LOG env var
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let gantry = Gantry::parse();
    match gantry.command {
        Commands::Infer {
            workspace,
            cache_dir,
            no_cache,
            pretty,
        } => infer_command(&workspace, cache_dir.as_deref(), no_cache, pretty),
        Commands::Cache { command } => match command {
            CacheCommands::Clear {
                workspace,
                cache_dir,
            } => cache_clear_command(&workspace, cache_dir.as_deref()),
        },
    }
}
