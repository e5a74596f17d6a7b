pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "keeper")]
#[command(about = "Remote secret storage with client-side encryption")]
#[command(version)]
pub struct Args {
    /// Server to talk to (defaults to localhost on the configured api_port)
    #[arg(long, global = true, env = "KEEPER_REMOTE")]
    pub remote: Option<Url>,

    /// Path to the keeper config directory (defaults to ~/.keeper)
    #[arg(long, global = true, env = "KEEPER_CONFIG_PATH")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
