use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::session_cache_dir;
use crate::cache::FileCache;

#[derive(Debug, Clone, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CacheAction {
    #[command(about = "Remove every cached session credential")]
    Clear,
    #[command(about = "Print the session cache directory")]
    Dir,
}

impl CacheCommand {
    pub async fn execute(self, cache_dir: Option<&Path>) -> Result<()> {
        let dir = session_cache_dir(cache_dir)?;

        match self.action {
            CacheAction::Clear => {
                let removed = FileCache::new(dir.clone())
                    .clear()
                    .await
                    .with_context(|| format!("Failed to clear session cache at {}", dir.display()))?;
                println!("Removed {removed} cached session(s) from {}", dir.display());
            }
            CacheAction::Dir => {
                println!("{}", dir.display());
            }
        }

        Ok(())
    }
}
