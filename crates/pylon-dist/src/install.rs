//! Embedded installer invocation.
//!
//! The downloaded binary carries its own `install` subcommand, which lays
//! out the real install tree under the pylon home. This module only runs it
//! and reports how it exited; download cleanup belongs to the caller.

use std::path::Path;

use tokio::process::Command;

use crate::error::DistError;

/// Run the downloaded binary's embedded `install` subcommand.
///
/// An explicit `target` is forwarded as the installation destination. Both
/// output streams are captured; stderr is attached to the error on failure.
///
/// # Errors
///
/// Returns [`DistError::InstallerSubprocessFailed`] on a non-zero exit, or
/// [`DistError::Io`] if the process cannot be spawned.
pub async fn run_installer(binary: &Path, target: Option<&Path>) -> Result<(), DistError> {
    let mut cmd = Command::new(binary);
    cmd.arg("install");
    if let Some(target) = target {
        cmd.arg(target);
    }

    tracing::debug!("Running embedded installer: {}", binary.display());
    let output = cmd.output().await?;

    if !output.status.success() {
        return Err(DistError::InstallerSubprocessFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}
