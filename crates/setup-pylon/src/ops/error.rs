use pylon_dist::DistError;

use crate::plugin::PluginError;

/// Failures that abort a setup run.
///
/// [`crate::cache::CacheError`] is deliberately absent: cache trouble
/// degrades to a miss or a skipped save, never to a failed run.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error(transparent)]
    Dist(#[from] DistError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
