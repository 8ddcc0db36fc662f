use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(version, about = "Infer cacheable task graphs from workspace tool configuration", long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Gantry {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a workspace and print the inferred graph fragment as JSON
    #[command(visible_alias = "i")]
    Infer {
        /// Workspace root (defaults to the current directory)
        #[arg(default_value = ".")]
        workspace: String,

        /// Directory holding the per-plugin target caches
        #[arg(long)]
        cache_dir: Option<String>,

        /// Discard previously cached targets before running
        #[arg(long)]
        no_cache: bool,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Manage the persisted target caches
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Remove all persisted target caches
    Clear {
        /// Workspace root (defaults to the current directory)
        #[arg(default_value = ".")]
        workspace: String,

        /// Directory holding the per-plugin target caches
        #[arg(long)]
        cache_dir: Option<String>,
    },
}
