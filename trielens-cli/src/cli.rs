use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "trielens",
    about = "Interactive inspector for a content-addressed key/value trie",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to config file (default: ./trielens.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the cluster layout (leaves aligned) for the hierarchy view
    #[arg(long, global = true)]
    pub cluster: bool,

    /// Horizontal spacing factor for the hierarchy view
    #[arg(long, global = true)]
    pub x_scale: Option<u32>,

    /// Vertical spacing factor for the hierarchy view
    #[arg(long, global = true)]
    pub y_scale: Option<f32>,

    /// Show the internal storage-node table
    #[arg(long, global = true)]
    pub show_storage: bool,

    /// Truncate displayed values longer than this many bytes (0 disables)
    #[arg(long, global = true)]
    pub truncate: Option<usize>,

    /// Seed the session with the well-known demo keys
    #[arg(long, global = true)]
    pub demo: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script file, print the resulting views, and exit
    Script {
        /// Script file to execute
        file: PathBuf,
    },

    /// Import a genesis document, print the resulting views, and exit
    Import {
        /// JSON document carrying genesis.raw.top
        file: PathBuf,
    },
}
