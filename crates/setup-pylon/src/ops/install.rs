//! The restore-or-install pipeline.
//!
//! One run restores a previous install from the runner cache when it can,
//! and otherwise downloads, verifies, and installs the stable binary, then
//! saves the install directories back to the cache. Cache trouble on either
//! side degrades to a warning; the rest of the pipeline is fail-fast.

use std::path::{Path, PathBuf};

use pylon_dist::{
    BINARY_NAME, InstallPaths, VersionToken, download, install as installer, manifest,
};
use tokio::io::AsyncWriteExt;

use crate::cache;
use crate::plugin;

use super::context::SetupContext;
use super::error::SetupError;

/// What one `setup-pylon install` invocation was asked to do.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    /// Requested version or channel.
    pub token: VersionToken,
    /// Optional target path handed to the binary's own installer.
    pub target: Option<PathBuf>,
    /// Marketplace sources to configure after install.
    pub marketplaces: Vec<String>,
    /// Plugins to install after install.
    pub plugins: Vec<String>,
}

/// How the run satisfied the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A cache entry was restored; the installer never ran.
    Restored {
        /// The cache key that matched.
        key: String,
    },
    /// A fresh install of this concrete version.
    Installed {
        /// The stable version that was downloaded and installed.
        version: String,
    },
}

/// Run the full pipeline: restore from cache, or install and save, then
/// export PATH and configure plugins.
///
/// # Errors
///
/// Distribution, installer, and plugin failures abort the run. Cache
/// failures never do.
pub async fn run(ctx: &SetupContext, req: &InstallRequest) -> Result<InstallOutcome, SetupError> {
    let paths = InstallPaths::resolve()?;
    run_at(ctx, req, &paths).await
}

async fn run_at(
    ctx: &SetupContext,
    req: &InstallRequest,
    paths: &InstallPaths,
) -> Result<InstallOutcome, SetupError> {
    let primary = ctx.primary_cache_key(&req.token).await?;
    let fallbacks = cache::restore_keys(&primary, ctx.platform.id());
    let cache_dirs = paths.cache_dirs().to_vec();

    let restored = match ctx.cache.restore(&cache_dirs, &primary, &fallbacks).await {
        Ok(Some(key)) => {
            tracing::info!("Restored previous install from cache key {key}");
            Some(key)
        }
        Ok(None) => {
            tracing::debug!("No cache entry for {primary} or its fallbacks");
            None
        }
        Err(err) => {
            tracing::warn!("Cache restore failed, continuing without cache: {err}");
            None
        }
    };

    let outcome = match restored {
        Some(key) => InstallOutcome::Restored { key },
        None => {
            let version = install_fresh(ctx, req.target.as_deref()).await?;

            if let Err(err) = save_install(ctx.cache.as_ref(), &cache_dirs, &primary).await {
                tracing::warn!("Cache save under {primary} failed: {err}");
            }
            InstallOutcome::Installed { version }
        }
    };

    export_path(&paths.bin).await?;
    plugin::configure(&paths.executable(), &req.marketplaces, &req.plugins).await?;
    Ok(outcome)
}

/// Download, verify, and run the stable installer binary.
///
/// The binary fetched is always the current stable build regardless of the
/// requested token; only the stable channel is guaranteed to ship a working
/// `install` subcommand. The requested token scopes the cache key, not the
/// installer.
async fn install_fresh(ctx: &SetupContext, target: Option<&Path>) -> Result<String, SetupError> {
    let stable = ctx.stable_version().await?.to_string();
    let checksum =
        manifest::fetch_checksum(&ctx.client, &ctx.dist_url, &stable, ctx.platform.id()).await?;

    let staging = tempfile::Builder::new()
        .prefix("setup-pylon-")
        .tempdir()
        .map_err(SetupError::Io)?;
    let binary = staging.path().join(BINARY_NAME);

    let url = download::binary_url(&ctx.dist_url, &stable, ctx.platform.id());
    download::download_and_verify(&ctx.client, &url, &binary, &checksum).await?;
    download::make_executable(&binary).await?;

    installer::run_installer(&binary, target).await?;
    tokio::fs::remove_file(&binary).await?;

    tracing::info!("Installed pylon {stable}");
    Ok(stable)
}

/// Ensure both install directories exist, then persist them under `key`.
/// The installer may leave `data/` uncreated; an empty directory still
/// caches. Everything here counts as cache trouble, never a run failure.
async fn save_install(
    service: &dyn cache::CacheService,
    dirs: &[PathBuf],
    key: &str,
) -> Result<(), cache::CacheError> {
    for dir in dirs {
        tokio::fs::create_dir_all(dir).await?;
    }
    service.save(dirs, key).await
}

/// Append the bin directory to the file named by `GITHUB_PATH`, the runner
/// contract for exposing tools to later workflow steps. Outside a workflow
/// the variable is unset and this is a no-op.
async fn export_path(bin: &Path) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_PATH") {
        Some(path_file) => append_path_entry(Path::new(&path_file), bin).await,
        None => {
            tracing::debug!("GITHUB_PATH not set, skipping PATH export");
            Ok(())
        }
    }
}

async fn append_path_entry(path_file: &Path, entry: &Path) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path_file)
        .await?;
    file.write_all(format!("{}\n", entry.display()).as_bytes())
        .await?;
    file.flush().await?;
    tracing::debug!("Exported {} to GITHUB_PATH", entry.display());
    Ok(())
}
