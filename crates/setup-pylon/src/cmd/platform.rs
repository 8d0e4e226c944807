//! Platform command

use anyhow::Result;
use pylon_dist::Platform;

/// Print the detected platform identifier.
pub fn platform() -> Result<()> {
    let platform = Platform::detect()?;
    println!("{platform}");
    Ok(())
}
