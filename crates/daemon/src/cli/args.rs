pub use clap::Parser;

use std::path::PathBuf;

use files_daemon::state::CONFIG_FILE_NAME;

#[derive(Parser, Debug)]
#[command(name = "files")]
#[command(about = "Serve configured directories over HTTP with tokens, API keys and share codes")]
pub struct Args {
    /// Path to the config file
    #[arg(long, global = true, env = "CONFIG", default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: crate::Command,
}
