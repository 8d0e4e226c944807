//! Filesystem locations of an installed pylon.

use std::path::PathBuf;

use dirs::home_dir;

/// Returns the pylon home directory, or `None` if the user's home cannot be
/// resolved. `PYLON_HOME` overrides the default `~/.pylon`.
pub fn try_pylon_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PYLON_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pylon"))
}

/// Install locations derived from the pylon home; constant for a given host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Root of the install tree.
    pub home: PathBuf,
    /// Directory holding the `pylon` executable, exported to `PATH`.
    pub bin: PathBuf,
    /// Opaque application state.
    pub data: PathBuf,
}

impl InstallPaths {
    /// Resolve the install layout for this host.
    ///
    /// # Errors
    ///
    /// Fails if neither `PYLON_HOME` nor the user's home directory can be
    /// resolved.
    pub fn resolve() -> std::io::Result<Self> {
        let home = try_pylon_home().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory; set PYLON_HOME to override",
            )
        })?;
        Ok(Self::under(home))
    }

    /// Derive the install layout under an explicit home directory.
    pub fn under(home: PathBuf) -> Self {
        let bin = home.join("bin");
        let data = home.join("data");
        Self { home, bin, data }
    }

    /// Full path of the installed executable.
    pub fn executable(&self) -> PathBuf {
        self.bin.join(crate::BINARY_NAME)
    }

    /// The directories persisted to and restored from the runner cache.
    /// Always both; a partial restore is never valid.
    pub fn cache_dirs(&self) -> [PathBuf; 2] {
        [self.bin.clone(), self.data.clone()]
    }
}
