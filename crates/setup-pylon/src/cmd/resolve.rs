//! Resolve command

use anyhow::Result;
use pylon_dist::{VersionToken, version};

/// Print the concrete version a token resolves to.
///
/// The latest channel is deliberately left symbolic: it never pins to a
/// version, its cache key carries the date instead.
pub async fn resolve(dist_url: &str, token: &str) -> Result<()> {
    match VersionToken::parse(token)? {
        VersionToken::Literal(v) => println!("{v}"),
        VersionToken::Stable => {
            let client = reqwest::Client::new();
            let resolved = version::resolve_stable(&client, dist_url).await?;
            println!("{resolved}");
        }
        VersionToken::Latest => println!("latest"),
    }
    Ok(())
}
