use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use super::session_cache_dir;
use crate::cache::FileCache;
use crate::chain::ProviderChain;
use crate::config;
use crate::output;
use crate::providers::SourceKind;

#[derive(Debug, Clone, Args)]
pub struct ResolveCommand {
    #[arg(
        short = 's',
        long,
        value_enum,
        help = "Resolve from this single source instead of walking the chain"
    )]
    pub source: Option<SourceKind>,
}

impl ResolveCommand {
    pub async fn execute(self, profile: &str, cache_dir: Option<&Path>) -> Result<()> {
        let rendered = resolve_to_json(profile, cache_dir, self.source).await?;
        // The one and only write to stdout.
        println!("{rendered}");
        Ok(())
    }
}

/// Resolve credentials for `profile` and render the stdout document.
pub async fn resolve_to_json(
    profile: &str,
    cache_dir: Option<&Path>,
    source: Option<SourceKind>,
) -> Result<String> {
    info!("Resolving credentials for profile: {}", profile);

    let config = config::load(profile)?;
    let cache = FileCache::new(session_cache_dir(cache_dir)?);
    let chain = ProviderChain::for_profile(&config, cache, source)?;
    debug!("Provider chain: {:?}", chain.source_names());

    let mut resolved = chain.resolve().await?;
    let credentials = resolved.freeze().await?;

    output::render(&credentials, resolved.expiration())
        .context("Failed to serialize credential_process output")
}
