//! Cache keys and the runner cache seam.
//!
//! Key discipline is what makes installs reusable across runs:
//!
//! - pinned or `stable` requests get a permanent key scoped to the concrete
//!   version, `pylon-{platform}-{version}`. `stable` is resolved to its
//!   concrete version *before* key construction so a release bump naturally
//!   invalidates older entries.
//! - `latest` requests get `pylon-{platform}-latest-{YYYY-MM-DD}` (UTC),
//!   which rolls daily so floating installs eventually refresh.
//!
//! The service itself sits behind [`CacheService`] so the pipeline can run
//! against [`NoopCache`] in tests and with `--no-cache`.

pub mod gha;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

pub use gha::GhaCache;

/// Prefix shared by every cache key this tool writes.
pub const CACHE_PREFIX: &str = "pylon";

/// Errors from the runner cache. Callers never treat these as fatal: a
/// failed restore is a miss and a failed save is a warning.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache service is not reachable from this run at all.
    #[error("Cache service unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport or status failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure while packing or unpacking an archive.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The service answered with something the client cannot use.
    #[error("Unexpected cache response: {0}")]
    Protocol(String),
}

/// The runner's key-value artifact cache.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Restore `paths` from the entry best matching `primary_key`, then the
    /// `restore_keys` prefixes in order. Returns the matched key, if any.
    async fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError>;

    /// Persist `paths` under `key`.
    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError>;
}

/// Cache service that never hits and never saves. Used with `--no-cache`,
/// when the runner provides no cache service, and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl CacheService for NoopCache {
    async fn restore(
        &self,
        _paths: &[PathBuf],
        _primary_key: &str,
        _restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn save(&self, _paths: &[PathBuf], _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Permanent key for a concrete release version.
pub fn version_key(platform_id: &str, version: &str) -> String {
    format!("{CACHE_PREFIX}-{platform_id}-{version}")
}

/// Daily-rolling key for the floating `latest` channel.
pub fn latest_key(platform_id: &str, date: NaiveDate) -> String {
    format!(
        "{CACHE_PREFIX}-{platform_id}-latest-{}",
        date.format("%Y-%m-%d")
    )
}

/// Ordered fallback prefixes the runner cache tries after the primary key:
/// first entries sharing the full primary key, then any entry for this
/// platform. Newest-first matching within a prefix is the cache's behavior.
pub fn restore_keys(primary_key: &str, platform_id: &str) -> [String; 2] {
    [
        format!("{primary_key}-"),
        format!("{CACHE_PREFIX}-{platform_id}-"),
    ]
}
