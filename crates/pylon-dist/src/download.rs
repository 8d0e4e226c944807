//! Streaming binary download with SHA-256 verification.
//!
//! The digest is computed chunk-by-chunk as the body arrives, so the file is
//! never read back for verification. A mismatch deletes the partial download
//! before the error surfaces.

use std::path::Path;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DistError;
use crate::manifest::Checksum;

/// URL of the release binary for `(version, platform_id)`.
pub fn binary_url(dist_url: &str, version: &str, platform_id: &str) -> String {
    format!(
        "{}/{version}/{platform_id}/{}",
        dist_url.trim_end_matches('/'),
        crate::BINARY_NAME
    )
}

/// Download `url` to `dest`, verifying its SHA-256 digest as it streams.
///
/// # Errors
///
/// Returns [`DistError::ChecksumMismatch`] (after removing the partial file)
/// if the bytes do not hash to `expected`, [`DistError::Http`] on transport
/// or status failures, or [`DistError::Io`] on filesystem failures.
pub async fn download_and_verify(
    client: &Client,
    url: &str,
    dest: &Path,
    expected: &Checksum,
) -> Result<(), DistError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
    }

    file.flush().await?;
    let actual = hex::encode(hasher.finalize());

    if actual != expected.as_str() {
        tokio::fs::remove_file(dest).await.ok();
        return Err(DistError::ChecksumMismatch {
            expected: expected.as_str().to_string(),
            actual,
        });
    }

    tracing::debug!("Verified {url} ({actual})");
    Ok(())
}

/// Mark a downloaded binary executable (mode 0755).
///
/// # Errors
///
/// Returns [`DistError::Io`] if the permissions cannot be read or written.
#[cfg(unix)]
pub async fn make_executable(path: &Path) -> Result<(), DistError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o755);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Mark a downloaded binary executable. No-op off Unix.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub async fn make_executable(_path: &Path) -> Result<(), DistError> {
    Ok(())
}
