//! setup-pylon CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use setup_pylon::cmd;
use setup_pylon::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let dist_url = cli.dist_url;

    match cli.command {
        Commands::Install {
            version,
            no_cache,
            target,
            marketplaces,
            plugins,
        } => {
            cmd::install::install(&dist_url, &version, no_cache, target, marketplaces, plugins)
                .await
        }
        Commands::Resolve { version } => cmd::resolve::resolve(&dist_url, &version).await,
        Commands::CacheKey { version } => cmd::cache_key::cache_key(&dist_url, &version).await,
        Commands::Platform => cmd::platform::platform(),
    }
}
