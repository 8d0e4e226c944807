//! GitHub Actions artifact cache client (v1 `artifactcache` REST API).
//!
//! The runner hands every step a service URL and a scoped bearer token via
//! `ACTIONS_CACHE_URL` / `ACTIONS_RUNTIME_TOKEN`. Restores query the entry
//! endpoint and download a signed archive URL; saves reserve an entry,
//! upload the archive, and commit it.
//!
//! Archives are gzipped tars whose top-level entries are the final path
//! components of the cached directories (`bin/`, `data/`), so restore and
//! save only need the directories' shared parent.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CacheError, CacheService};

const API_ACCEPT: &str = "application/json;api-version=6.0-preview.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    cache_key: String,
    archive_location: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveRequest<'a> {
    key: &'a str,
    version: &'a str,
    cache_size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveResponse {
    cache_id: i64,
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    size: u64,
}

/// Client for the runner-provided artifact cache service.
#[derive(Clone)]
pub struct GhaCache {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for GhaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhaCache")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GhaCache {
    /// Build a client from the service endpoint and bearer token the runner
    /// injects into each step.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Build a client from `ACTIONS_CACHE_URL` and `ACTIONS_RUNTIME_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] when either variable is unset,
    /// which is the normal state outside a workflow run.
    pub fn from_env(client: reqwest::Client) -> Result<Self, CacheError> {
        let base_url = std::env::var("ACTIONS_CACHE_URL")
            .map_err(|_| CacheError::Unavailable("ACTIONS_CACHE_URL not set".to_string()))?;
        let token = std::env::var("ACTIONS_RUNTIME_TOKEN")
            .map_err(|_| CacheError::Unavailable("ACTIONS_RUNTIME_TOKEN not set".to_string()))?;
        Ok(Self::new(client, base_url, token))
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/_apis/artifactcache/{resource}",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn restore_inner(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        let keys = std::iter::once(primary_key)
            .chain(restore_keys.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",");
        let version = cache_version(paths);

        let response = self
            .client
            .get(self.endpoint("cache"))
            .query(&[("keys", keys.as_str()), ("version", version.as_str())])
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, API_ACCEPT)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT
            || response.status() == reqwest::StatusCode::NOT_FOUND
        {
            return Ok(None);
        }
        let entry: CacheEntry = response.error_for_status()?.json().await?;

        // The archive URL is pre-signed; no auth header.
        let archive = self
            .client
            .get(&entry.archive_location)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let root = unpack_root(paths)?;
        tokio::fs::create_dir_all(&root).await?;

        let tmp = tempfile::Builder::new()
            .prefix("setup-pylon-")
            .tempdir()
            .map_err(CacheError::Io)?;
        let archive_path = tmp.path().join("cache.tgz");
        tokio::fs::write(&archive_path, &archive).await?;

        tokio::task::spawn_blocking(move || unpack_archive(&archive_path, &root))
            .await
            .map_err(std::io::Error::other)??;

        tracing::debug!("Restored cache entry {}", entry.cache_key);
        Ok(Some(entry.cache_key))
    }

    async fn save_inner(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError> {
        let version = cache_version(paths);

        let tmp = tempfile::Builder::new()
            .prefix("setup-pylon-")
            .tempdir()
            .map_err(CacheError::Io)?;
        let archive_path = tmp.path().join("cache.tgz");

        let to_pack = paths.to_vec();
        let pack_dest = archive_path.clone();
        let size = tokio::task::spawn_blocking(move || pack_archive(&to_pack, &pack_dest))
            .await
            .map_err(std::io::Error::other)??;

        let response = self
            .client
            .post(self.endpoint("caches"))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, API_ACCEPT)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .json(&ReserveRequest {
                key,
                version: &version,
                cache_size: size,
            })
            .send()
            .await?;

        // Another run reserved this key first; same key, same payload.
        if response.status() == reqwest::StatusCode::CONFLICT {
            tracing::warn!("Cache entry for {key} already reserved elsewhere, skipping save");
            return Ok(());
        }
        let reserved: ReserveResponse = response.error_for_status()?.json().await?;

        let body = tokio::fs::read(&archive_path).await?;
        self.client
            .patch(format!("{}/{}", self.endpoint("caches"), reserved.cache_id))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, API_ACCEPT)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .header(
                reqwest::header::CONTENT_RANGE,
                format!("bytes 0-{}/*", size.saturating_sub(1)),
            )
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        self.client
            .post(format!("{}/{}", self.endpoint("caches"), reserved.cache_id))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, API_ACCEPT)
            .json(&CommitRequest { size })
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("Saved cache entry {key} ({size} bytes)");
        Ok(())
    }
}

#[async_trait]
impl CacheService for GhaCache {
    async fn restore(
        &self,
        paths: &[PathBuf],
        primary_key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        self.restore_inner(paths, primary_key, restore_keys).await
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError> {
        self.save_inner(paths, key).await
    }
}

/// Cache "version" parameter: a digest of the sorted path set plus the
/// archive format tag. Entries only match requests with the same layout.
fn cache_version(paths: &[PathBuf]) -> String {
    let mut sorted: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for path in &sorted {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"tar.gz");
    hex::encode(hasher.finalize())
}

/// The shared parent directory archives unpack into.
fn unpack_root(paths: &[PathBuf]) -> Result<PathBuf, CacheError> {
    let mut root: Option<&Path> = None;
    for path in paths {
        let parent = path.parent().ok_or_else(|| {
            CacheError::Protocol(format!("cache path has no parent: {}", path.display()))
        })?;
        match root {
            None => root = Some(parent),
            Some(seen) if seen == parent => {}
            Some(seen) => {
                return Err(CacheError::Protocol(format!(
                    "cache paths must share a parent directory: {} vs {}",
                    seen.display(),
                    parent.display()
                )));
            }
        }
    }
    root.map(Path::to_path_buf)
        .ok_or_else(|| CacheError::Protocol("no cache paths requested".to_string()))
}

fn pack_archive(paths: &[PathBuf], dest: &Path) -> std::io::Result<u64> {
    let file = std::fs::File::create(dest)?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for path in paths {
        let name = path.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cache path has no file name: {}", path.display()),
            )
        })?;
        builder.append_dir_all(name, path)?;
    }

    let encoder = builder.into_inner()?;
    let file = encoder.finish()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn unpack_archive(archive: &Path, root: &Path) -> std::io::Result<()> {
    let file = std::fs::File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(root)
}
