//! Shared per-run state.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use pylon_dist::{DistError, Platform, VersionToken, version};
use tokio::sync::OnceCell;

use crate::cache::{self, CacheService};

/// State threaded through every operation of a single run: the HTTP client,
/// the distribution endpoint, the detected platform, the runner cache, and
/// the memoized stable-channel resolution.
pub struct SetupContext {
    /// Shared HTTP client.
    pub client: reqwest::Client,
    /// Distribution bucket base URL.
    pub dist_url: String,
    /// Host platform, detected once at startup.
    pub platform: Platform,
    /// Runner cache service.
    pub cache: Arc<dyn CacheService>,
    stable: OnceCell<String>,
}

impl fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupContext")
            .field("dist_url", &self.dist_url)
            .field("platform", &self.platform)
            .field("stable", &self.stable.get())
            .finish_non_exhaustive()
    }
}

impl SetupContext {
    /// Create the context for one run.
    pub fn new(
        client: reqwest::Client,
        dist_url: impl Into<String>,
        platform: Platform,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            client,
            dist_url: dist_url.into(),
            platform,
            cache,
            stable: OnceCell::new(),
        }
    }

    /// The concrete version the stable channel points at, fetched on first
    /// use and memoized for the rest of the run. Cache keys and download
    /// URLs must agree on one value even if the remote pointer moves while
    /// the run is in flight.
    pub async fn stable_version(&self) -> Result<&str, DistError> {
        self.stable
            .get_or_try_init(|| version::resolve_stable(&self.client, &self.dist_url))
            .await
            .map(String::as_str)
    }

    /// Primary cache key for `token` on this platform.
    ///
    /// Literal versions and the stable channel get permanent version-scoped
    /// keys; stable is resolved first so a version bump invalidates the key
    /// instead of serving a stale install. The latest channel gets a key
    /// scoped to the current UTC date, rolling every 24h.
    pub async fn primary_cache_key(&self, token: &VersionToken) -> Result<String, DistError> {
        match token {
            VersionToken::Literal(v) => Ok(cache::version_key(self.platform.id(), v)),
            VersionToken::Stable => {
                let stable = self.stable_version().await?;
                Ok(cache::version_key(self.platform.id(), stable))
            }
            VersionToken::Latest => Ok(cache::latest_key(
                self.platform.id(),
                Utc::now().date_naive(),
            )),
        }
    }
}
