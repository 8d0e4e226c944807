//! Cache-key command

use std::sync::Arc;

use anyhow::Result;
use pylon_dist::{Platform, VersionToken};

use crate::cache::{self, NoopCache};
use crate::ops::SetupContext;

/// Print the primary cache key for a token, then its two fallback prefixes
/// in the order the runner cache tries them.
pub async fn cache_key(dist_url: &str, token: &str) -> Result<()> {
    let platform = Platform::detect()?;
    let ctx = SetupContext::new(
        reqwest::Client::new(),
        dist_url,
        platform,
        Arc::new(NoopCache),
    );

    let primary = ctx.primary_cache_key(&VersionToken::parse(token)?).await?;
    println!("{primary}");
    for fallback in cache::restore_keys(&primary, ctx.platform.id()) {
        println!("{fallback}");
    }
    Ok(())
}
