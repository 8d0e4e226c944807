//! Version tokens and channel resolution.
//!
//! Users request either a pinned release (`1.0.42`) or a floating channel
//! (`stable`, `latest`). Only `stable` resolves to a concrete version: the
//! bucket serves a single-line plaintext pointer at `{bucket}/stable`.
//! `latest` deliberately never pins; the binary actually installed for it is
//! always the current stable build, and only its cache key floats daily.

use reqwest::Client;

use crate::error::DistError;

/// A user-supplied version request, consumed immediately after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionToken {
    /// An exact release version, e.g. `1.0.42`.
    Literal(String),
    /// The floating `stable` channel.
    #[default]
    Stable,
    /// The floating `latest` channel.
    Latest,
}

impl VersionToken {
    /// Parse user input. Channel aliases map to their variants; anything
    /// else non-empty is a literal version.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::InvalidVersionToken`] for empty or
    /// whitespace-only input, which would otherwise produce a cache key
    /// equal to the bare platform prefix.
    pub fn parse(s: &str) -> Result<Self, DistError> {
        match s.trim() {
            "" => Err(DistError::InvalidVersionToken),
            "stable" => Ok(Self::Stable),
            "latest" => Ok(Self::Latest),
            other => Ok(Self::Literal(other.to_string())),
        }
    }

    /// True for channel aliases that float across releases.
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Stable | Self::Latest)
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Stable => write!(f, "stable"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Fetch the concrete version the `stable` channel currently points at.
///
/// # Errors
///
/// Returns [`DistError::VersionResolutionFailed`] if the pointer is empty
/// after trimming, or [`DistError::Http`] if the request fails.
pub async fn resolve_stable(client: &Client, dist_url: &str) -> Result<String, DistError> {
    let url = format!("{}/stable", dist_url.trim_end_matches('/'));

    let text = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let version = text.trim();
    if version.is_empty() {
        return Err(DistError::VersionResolutionFailed {
            channel: "stable".to_string(),
            reason: format!("empty version pointer at {url}"),
        });
    }

    tracing::debug!("Resolved stable channel to {version}");
    Ok(version.to_string())
}
