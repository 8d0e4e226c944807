//! Distribution client for the `pylon` CLI.
//!
//! Everything needed to turn "install pylon X" into a verified binary on
//! disk: host platform detection, version-channel resolution, per-release
//! integrity manifests, streaming downloads with SHA-256 verification, and
//! invocation of the binary's embedded installer.
//!
//! The release bucket layout this crate consumes:
//!
//! ```text
//! {bucket}/stable                              single-line version pointer
//! {bucket}/{version}/manifest.json             checksums per platform id
//! {bucket}/{version}/{platform_id}/pylon       the release binary
//! ```

pub mod download;
pub mod error;
pub mod install;
pub mod manifest;
pub mod paths;
pub mod platform;
pub mod version;

pub use error::DistError;
pub use manifest::{Checksum, ReleaseManifest};
pub use paths::InstallPaths;
pub use platform::Platform;
pub use version::VersionToken;

/// User Agent string for distribution requests
pub const USER_AGENT: &str = concat!("pylon-dist/", env!("CARGO_PKG_VERSION"));

/// Default base URL of the release bucket.
pub const DEFAULT_DIST_URL: &str = "https://releases.pylon.sh";

/// Name of the distributed executable.
pub const BINARY_NAME: &str = "pylon";
