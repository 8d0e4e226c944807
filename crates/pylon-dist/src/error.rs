//! Error types for the distribution pipeline.

use thiserror::Error;

/// Errors produced while resolving, fetching, verifying, or installing a
/// release. Every variant is fatal to the run; there is no retry policy.
#[derive(Error, Debug)]
pub enum DistError {
    /// The host OS/arch combination has no published `pylon` build.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform {
        /// OS name as reported by the host.
        os: String,
        /// Architecture name as reported by the host.
        arch: String,
    },

    /// The requested version token is empty.
    #[error("Invalid version token: must be a version number, 'stable', or 'latest'")]
    InvalidVersionToken,

    /// A floating channel could not be resolved to a concrete version.
    #[error("Failed to resolve '{channel}' channel: {reason}")]
    VersionResolutionFailed {
        /// The channel alias that was being resolved.
        channel: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The release manifest has no entry for the detected platform.
    #[error("No manifest entry for platform '{platform}' in release {version}")]
    ManifestMissing {
        /// The release the manifest belongs to.
        version: String,
        /// The platform id that was looked up.
        platform: String,
    },

    /// A manifest checksum is not 64 lowercase hex characters.
    #[error("Invalid checksum format: expected 64 lowercase hex characters, got '{found}'")]
    InvalidChecksumFormat {
        /// The malformed checksum string as it appeared in the manifest.
        found: String,
    },

    /// Downloaded bytes did not hash to the manifest checksum.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest the manifest promised.
        expected: String,
        /// Digest the downloaded bytes produced.
        actual: String,
    },

    /// The binary's embedded `install` subcommand exited non-zero.
    #[error("Installer exited with {status}: {stderr}")]
    InstallerSubprocessFailed {
        /// Exit status of the child process.
        status: std::process::ExitStatus,
        /// Captured stderr of the child process.
        stderr: String,
    },

    /// HTTP transport or status failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
