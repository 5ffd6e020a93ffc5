use std::path::{Path, PathBuf};

pub mod cache;
pub mod completions;
pub mod resolve;

pub use cache::CacheCommand;
pub use completions::CompletionsCommand;
pub use resolve::ResolveCommand;

use crate::constants;
use crate::error::ResolveError;

pub(crate) fn session_cache_dir(override_dir: Option<&Path>) -> Result<PathBuf, ResolveError> {
    constants::get_cache_dir(override_dir).ok_or_else(|| {
        ResolveError::configuration("could not determine the session cache directory")
    })
}
