//! Host platform detection.
//!
//! Release artifacts are published per `{os}-{arch}` pair, with a separate
//! `-musl` build for Linux hosts whose libc is musl. Windows has no `pylon`
//! build, so it is rejected outright rather than modeled as a variant.

use std::fmt;
use std::path::Path;

use crate::error::DistError;

/// Operating system family with a published `pylon` build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// macOS hosts (`darwin` in artifact names).
    Darwin,
    /// Linux hosts, glibc or musl.
    Linux,
}

impl Os {
    /// Artifact-name representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CPU architecture with a published `pylon` build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// `x86_64` hosts (`x64` in artifact names).
    X64,
    /// 64-bit ARM hosts.
    Arm64,
}

impl Arch {
    /// Artifact-name representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The detected host platform, computed once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
    id: String,
}

/// Dynamic-linker paths that identify a musl host.
const MUSL_MARKERS: [&str; 2] = ["/lib/ld-musl-x86_64.so.1", "/lib/ld-musl-aarch64.so.1"];

impl Platform {
    /// Detect the current host platform.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::UnsupportedPlatform`] for any OS/arch pair
    /// without a published build (including all Windows hosts).
    pub fn detect() -> Result<Self, DistError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH, is_musl_host())
    }

    /// Build a platform from raw OS/arch names plus a musl flag.
    ///
    /// Accepts both Rust conventions (`macos`, `x86_64`, `aarch64`) and
    /// artifact-name conventions (`darwin`, `x64`, `arm64`). The musl flag
    /// only takes effect on Linux.
    ///
    /// # Errors
    ///
    /// Returns [`DistError::UnsupportedPlatform`] for anything outside the
    /// enumerated set.
    pub fn from_parts(os: &str, arch: &str, musl: bool) -> Result<Self, DistError> {
        let unsupported = || DistError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let os_kind = match os {
            "macos" | "darwin" => Os::Darwin,
            "linux" => Os::Linux,
            _ => return Err(unsupported()),
        };
        let arch_kind = match arch {
            "x86_64" | "x64" => Arch::X64,
            "aarch64" | "arm64" => Arch::Arm64,
            _ => return Err(unsupported()),
        };

        let mut id = format!("{os_kind}-{arch_kind}");
        if os_kind == Os::Linux && musl {
            id.push_str("-musl");
        }

        Ok(Self {
            os: os_kind,
            arch: arch_kind,
            id,
        })
    }

    /// Canonical `{os}-{arch}[-musl]` identifier used in download URLs,
    /// manifest lookups, and cache keys.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Best-effort check for a musl libc. Any filesystem error reads as
/// "not musl"; the check must never fail an otherwise supported host.
fn is_musl_host() -> bool {
    MUSL_MARKERS.iter().any(|p| Path::new(p).exists())
}
