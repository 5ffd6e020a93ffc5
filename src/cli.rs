use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{CacheCommand, CompletionsCommand, ResolveCommand};
use crate::constants::default_profile;

#[derive(Debug, Clone, Parser)]
#[command(name = "chai", version, about = "AWS credential_process helper with chained sources and session caching", long_about = None, arg_required_else_help = false)]
pub struct Cli {
    // `default_value` (not `default_value_t`) so the expression is evaluated
    // on every parse: clap_derive wraps `default_value_t` in a process-wide
    // OnceLock, which would freeze the AWS_PROFILE fallback at first use.
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = default_profile(),
        help = "AWS profile name (falls back to AWS_PROFILE)"
    )]
    pub profile: String,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory for cached session credentials"
    )]
    pub cache_dir: Option<PathBuf>,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace); logs go to stderr")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Resolve credentials and print them in credential_process format")]
    Resolve(ResolveCommand),
    #[command(about = "Inspect or clear the session credential cache")]
    Cache(CacheCommand),
    #[command(about = "Generate shell completion scripts for chai")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;
        let cache_dir = self.cache_dir;
        let command = self
            .command
            .unwrap_or(Commands::Resolve(ResolveCommand { source: None }));

        match command {
            Commands::Resolve(cmd) => cmd.execute(&profile, cache_dir.as_deref()).await,
            Commands::Cache(cmd) => cmd.execute(cache_dir.as_deref()).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
