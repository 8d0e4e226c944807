//! Release manifests and checksum validation.
//!
//! Each release publishes a `manifest.json` mapping platform ids to the
//! expected SHA-256 of that platform's binary. Manifests are fetched fresh
//! per install and never cached on disk.

use std::collections::HashMap;
use std::fmt;

use reqwest::Client;
use serde::Deserialize;

use crate::error::DistError;

/// A validated SHA-256 checksum: exactly 64 lowercase hex characters.
///
/// Manifest entries deserialize as plain strings; validation happens when
/// the entry for the requested platform is extracted, so a malformed entry
/// for some other platform never blocks an install.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum(String);

impl Checksum {
    /// Validate a manifest checksum string.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::InvalidChecksumFormat`] unless `s` is exactly
    /// 64 lowercase hex characters. Uppercase hex is rejected: digests are
    /// compared byte-for-byte against `hex`-encoded output.
    pub fn new(s: &str) -> Result<Self, DistError> {
        let well_formed = s.len() == 64
            && s.chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));

        if well_formed {
            Ok(Self(s.to_string()))
        } else {
            Err(DistError::InvalidChecksumFormat {
                found: s.to_string(),
            })
        }
    }

    /// The checksum as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Checksum {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-platform artifact entry in a release manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformArtifact {
    /// Expected SHA-256 of the binary, unvalidated until lookup.
    pub checksum: String,
}

/// A per-release manifest listing expected checksums by platform id.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseManifest {
    /// Platform id to artifact metadata.
    pub platforms: HashMap<String, PlatformArtifact>,
}

impl ReleaseManifest {
    /// Extract and validate the checksum for `platform_id`.
    ///
    /// `version` is only used to report which release lacked the entry.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::ManifestMissing`] if the platform key is absent,
    /// or [`DistError::InvalidChecksumFormat`] if its checksum is malformed.
    pub fn checksum_for(&self, version: &str, platform_id: &str) -> Result<Checksum, DistError> {
        let entry = self
            .platforms
            .get(platform_id)
            .ok_or_else(|| DistError::ManifestMissing {
                version: version.to_string(),
                platform: platform_id.to_string(),
            })?;

        Checksum::new(&entry.checksum)
    }
}

/// URL of the manifest for a concrete release version.
pub fn manifest_url(dist_url: &str, version: &str) -> String {
    format!("{}/{version}/manifest.json", dist_url.trim_end_matches('/'))
}

/// Fetch and parse the release manifest for `version`.
///
/// # Errors
///
/// Returns [`DistError::Http`] on transport failures, non-success statuses,
/// or a body that does not parse as a manifest.
pub async fn fetch_manifest(
    client: &Client,
    dist_url: &str,
    version: &str,
) -> Result<ReleaseManifest, DistError> {
    let url = manifest_url(dist_url, version);

    let manifest = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .json::<ReleaseManifest>()
        .await?;

    tracing::debug!(
        "Fetched manifest for {version} ({} platforms)",
        manifest.platforms.len()
    );
    Ok(manifest)
}

/// Fetch the expected checksum for `(version, platform_id)` in one step.
///
/// # Errors
///
/// Propagates [`fetch_manifest`] and [`ReleaseManifest::checksum_for`]
/// failures.
pub async fn fetch_checksum(
    client: &Client,
    dist_url: &str,
    version: &str,
    platform_id: &str,
) -> Result<Checksum, DistError> {
    let manifest = fetch_manifest(client, dist_url, version).await?;
    manifest.checksum_for(version, platform_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const GOOD: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn manifest_with(platform: &str, checksum: &str) -> ReleaseManifest {
        let body = format!(r#"{{"platforms": {{"{platform}": {{"checksum": "{checksum}"}}}}}}"#);
        serde_json::from_str(&body).unwrap()
    }

    #[test]
    fn checksum_accepts_lowercase_hex() {
        let checksum = Checksum::new(GOOD).unwrap();
        assert_eq!(checksum.as_str(), GOOD);
    }

    #[test]
    fn checksum_rejects_uppercase_wrong_length_and_non_hex() {
        let bad_inputs = [
            GOOD.to_uppercase(),
            GOOD[..63].to_string(),
            format!("{GOOD}0"),
            format!("{}zz", &GOOD[..62]),
            String::new(),
        ];
        for bad in &bad_inputs {
            let err = Checksum::new(bad).unwrap_err();
            assert!(
                matches!(err, DistError::InvalidChecksumFormat { .. }),
                "expected rejection for '{bad}'"
            );
        }
    }

    #[test]
    fn checksum_for_finds_the_platform_entry() {
        let manifest = manifest_with("linux-x64", GOOD);
        let checksum = manifest.checksum_for("1.0.0", "linux-x64").unwrap();
        assert_eq!(checksum.as_str(), GOOD);
    }

    #[test]
    fn checksum_for_reports_a_missing_platform() {
        let manifest = manifest_with("linux-x64", GOOD);
        let err = manifest.checksum_for("1.0.0", "darwin-arm64").unwrap_err();
        assert!(matches!(
            err,
            DistError::ManifestMissing { version, platform }
                if version == "1.0.0" && platform == "darwin-arm64"
        ));
    }

    #[test]
    fn malformed_entry_for_another_platform_is_tolerated() {
        let body = format!(
            r#"{{"platforms": {{
                "linux-x64": {{"checksum": "{GOOD}"}},
                "darwin-arm64": {{"checksum": "not-a-digest"}}
            }}}}"#
        );
        let manifest: ReleaseManifest = serde_json::from_str(&body).unwrap();

        assert!(manifest.checksum_for("1.0.0", "linux-x64").is_ok());
        let err = manifest.checksum_for("1.0.0", "darwin-arm64").unwrap_err();
        assert!(matches!(err, DistError::InvalidChecksumFormat { .. }));
    }

    #[tokio::test]
    async fn fetch_checksum_reads_the_bucket_manifest() {
        let mut server = Server::new_async().await;
        let body = format!(r#"{{"platforms": {{"linux-x64": {{"checksum": "{GOOD}"}}}}}}"#);
        let _m = server
            .mock("GET", "/1.0.0/manifest.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = Client::new();
        let checksum = fetch_checksum(&client, &server.url(), "1.0.0", "linux-x64")
            .await
            .unwrap();
        assert_eq!(checksum.as_str(), GOOD);
    }

    #[tokio::test]
    async fn fetch_manifest_propagates_missing_releases() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/9.9.9/manifest.json")
            .with_status(404)
            .create_async()
            .await;

        let client = Client::new();
        let err = fetch_manifest(&client, &server.url(), "9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(err, DistError::Http(_)));
    }
}
