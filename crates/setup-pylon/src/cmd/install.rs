//! Install command

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use pylon_dist::{Platform, VersionToken};

use crate::cache::{CacheService, GhaCache, NoopCache};
use crate::ops::install::{InstallOutcome, InstallRequest};
use crate::ops::{SetupContext, install};

/// Restore pylon from the runner cache or install it fresh, then export
/// PATH and configure any requested plugins.
pub async fn install(
    dist_url: &str,
    version: &str,
    no_cache: bool,
    target: Option<PathBuf>,
    marketplaces: Vec<String>,
    plugins: Vec<String>,
) -> Result<()> {
    let platform = Platform::detect()?;
    let client = reqwest::Client::new();

    let cache: Arc<dyn CacheService> = if no_cache {
        Arc::new(NoopCache)
    } else {
        match GhaCache::from_env(client.clone()) {
            Ok(gha) => Arc::new(gha),
            Err(err) => {
                tracing::warn!("Runner cache unavailable, installing without it: {err}");
                Arc::new(NoopCache)
            }
        }
    };

    let ctx = SetupContext::new(client, dist_url, platform, cache);
    let req = InstallRequest {
        token: VersionToken::parse(version)?,
        target,
        marketplaces,
        plugins,
    };

    match install::run(&ctx, &req).await? {
        InstallOutcome::Restored { key } => println!("Restored pylon from cache ({key})"),
        InstallOutcome::Installed { version } => println!("Installed pylon {version}"),
    }
    Ok(())
}
