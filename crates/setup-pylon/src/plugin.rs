//! Plugin and marketplace configuration via the installed `pylon` binary.
//!
//! Everything here is a thin wrapper around `pylon plugin ...` subprocesses.
//! Inputs are validated against a strict ASCII whitelist before any of them
//! reach a command line, and the add-vs-update decision for marketplaces is
//! made from the CLI's machine-readable `marketplace list --json` output.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

/// Upper bound on marketplace source and plugin name length, in bytes.
pub const MAX_INPUT_LEN: usize = 256;

/// Why an input failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty or whitespace-only input.
    Empty,
    /// Longer than [`MAX_INPUT_LEN`] bytes.
    TooLong,
    /// Begins with `-`, which argv parsing reserves for flags.
    LeadingDash,
    /// A character outside the whitelist for this input kind.
    ForbiddenCharacter(char),
    /// Structurally wrong, e.g. an empty half around `@`.
    InvalidFormat,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty input"),
            Self::TooLong => write!(f, "longer than {MAX_INPUT_LEN} bytes"),
            Self::LeadingDash => write!(f, "may not begin with '-'"),
            Self::ForbiddenCharacter(c) => write!(f, "forbidden character {c:?}"),
            Self::InvalidFormat => write!(f, "expected name or name@marketplace"),
        }
    }
}

/// Failures while configuring marketplaces or installing plugins.
#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("Invalid {what} {input:?}: {reason}")]
    Rejected {
        what: &'static str,
        input: String,
        reason: RejectReason,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Malformed marketplace listing: {0}")]
    Listing(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of `pylon plugin marketplace list --json`.
#[derive(Debug, Deserialize)]
pub struct MarketplaceEntry {
    /// Short name the CLI assigned to the marketplace.
    pub name: String,
    /// The source it was added from (git URL or `owner/repo`).
    pub source: String,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn is_source_char(c: char) -> bool {
    is_name_char(c) || matches!(c, '/' | '@' | ':')
}

fn check_basic(input: &str) -> Result<(), RejectReason> {
    if input.trim().is_empty() {
        return Err(RejectReason::Empty);
    }
    if input.len() > MAX_INPUT_LEN {
        return Err(RejectReason::TooLong);
    }
    if input.starts_with('-') {
        return Err(RejectReason::LeadingDash);
    }
    Ok(())
}

fn check_chars(input: &str, allowed: fn(char) -> bool) -> Result<(), RejectReason> {
    match input.chars().find(|c| !allowed(*c)) {
        Some(c) => Err(RejectReason::ForbiddenCharacter(c)),
        None => Ok(()),
    }
}

/// Validate a marketplace source: a git URL or `owner/repo` slug.
///
/// The ASCII whitelist (alphanumerics plus `.-_/@:`) rejects shell
/// metacharacters, whitespace, and any non-ASCII input outright.
///
/// # Errors
///
/// Returns the first applicable [`RejectReason`].
pub fn validate_marketplace_source(input: &str) -> Result<(), RejectReason> {
    check_basic(input)?;
    check_chars(input, is_source_char)
}

/// Validate a plugin name, optionally scoped as `name@marketplace`.
///
/// Both halves allow ASCII alphanumerics plus `.-_`; an empty half is
/// [`RejectReason::InvalidFormat`].
///
/// # Errors
///
/// Returns the first applicable [`RejectReason`].
pub fn validate_plugin_name(input: &str) -> Result<(), RejectReason> {
    check_basic(input)?;

    let (name, marketplace) = match input.split_once('@') {
        Some((name, marketplace)) => (name, Some(marketplace)),
        None => (input, None),
    };
    if name.is_empty() || marketplace.is_some_and(str::is_empty) {
        return Err(RejectReason::InvalidFormat);
    }

    check_chars(name, is_name_char)?;
    if let Some(marketplace) = marketplace {
        check_chars(marketplace, is_name_char)?;
    }
    Ok(())
}

/// Configure the requested marketplaces and install the requested plugins
/// against a freshly available `pylon` executable.
///
/// All inputs are validated before the first subprocess runs. Marketplaces
/// already present in the CLI's listing are updated in place instead of
/// re-added. Subprocess failures here are fatal to the run.
///
/// # Errors
///
/// Returns [`PluginError::Rejected`] for invalid inputs, and
/// [`PluginError::Subprocess`] when the CLI reports failure.
pub async fn configure(
    executable: &Path,
    marketplaces: &[String],
    plugins: &[String],
) -> Result<(), PluginError> {
    if marketplaces.is_empty() && plugins.is_empty() {
        return Ok(());
    }

    for source in marketplaces {
        validate_marketplace_source(source).map_err(|reason| PluginError::Rejected {
            what: "marketplace source",
            input: source.clone(),
            reason,
        })?;
    }
    for name in plugins {
        validate_plugin_name(name).map_err(|reason| PluginError::Rejected {
            what: "plugin name",
            input: name.clone(),
            reason,
        })?;
    }

    if !marketplaces.is_empty() {
        let existing = list_marketplaces(executable).await?;
        for source in marketplaces {
            match existing.iter().find(|entry| &entry.source == source) {
                Some(entry) => {
                    tracing::debug!("Marketplace {source} already configured as {}", entry.name);
                    run_pylon(executable, &["plugin", "marketplace", "update", &entry.name])
                        .await?;
                }
                None => {
                    run_pylon(executable, &["plugin", "marketplace", "add", source]).await?;
                    tracing::info!("Added plugin marketplace {source}");
                }
            }
        }
    }

    for name in plugins {
        run_pylon(executable, &["plugin", "install", name]).await?;
        tracing::info!("Installed plugin {name}");
    }
    Ok(())
}

async fn list_marketplaces(executable: &Path) -> Result<Vec<MarketplaceEntry>, PluginError> {
    let stdout = capture_pylon(executable, &["plugin", "marketplace", "list", "--json"]).await?;
    Ok(serde_json::from_str(&stdout)?)
}

async fn exec_pylon(
    executable: &Path,
    args: &[&str],
) -> Result<std::process::Output, PluginError> {
    let output = Command::new(executable).args(args).output().await?;
    if !output.status.success() {
        return Err(PluginError::Subprocess {
            command: format!("pylon {}", args.join(" ")),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

async fn run_pylon(executable: &Path, args: &[&str]) -> Result<(), PluginError> {
    exec_pylon(executable, args).await?;
    Ok(())
}

async fn capture_pylon(executable: &Path, args: &[&str]) -> Result<String, PluginError> {
    let output = exec_pylon(executable, args).await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
