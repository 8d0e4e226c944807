//! setup-pylon - CI installer for the pylon CLI
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Installs the `pylon` CLI on ephemeral GitHub Actions runners, reusing the
//! runner's artifact cache across runs and optionally configuring plugin
//! marketplaces afterwards.
//!
//! # Pipeline
//!
//! ```text
//! restore(primary key, fallback prefixes)
//!   ├── hit  -> export PATH -> configure plugins
//!   └── miss -> resolve stable -> fetch manifest checksum
//!               -> download + verify + chmod -> pylon install
//!               -> save(primary key) -> export PATH -> configure plugins
//! ```
//!
//! # Cache keys
//!
//! ```text
//! pylon-{platform}-{version}            pinned or resolved stable (permanent)
//! pylon-{platform}-latest-{YYYY-MM-DD}  latest channel (rolls daily, UTC)
//! ```
//!
//! Cache failures never fail a run: an unreachable cache degrades to a plain
//! install with a warning.

pub mod cache;
pub mod cmd;
pub mod ops;
pub mod plugin;

pub use crate::ops::SetupContext;
pub use crate::ops::SetupError;

/// User Agent string (re-exported from pylon_dist)
pub use pylon_dist::USER_AGENT;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "setup-pylon")]
#[command(author, version = env!("SETUP_PYLON_VERSION"))]
#[command(about = "Install and cache the pylon CLI on CI runners")]
pub struct Cli {
    /// Distribution bucket base URL
    #[arg(
        long,
        global = true,
        env = "PYLON_DIST_URL",
        default_value = pylon_dist::DEFAULT_DIST_URL
    )]
    pub dist_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Restore pylon from the runner cache, or install it fresh
    Install {
        /// Version scoping the cache: a literal like 1.0.0, stable, or latest
        #[arg(default_value = "stable")]
        version: String,
        /// Skip the runner cache for this run
        #[arg(long)]
        no_cache: bool,
        /// Target path forwarded to pylon's own installer
        #[arg(long)]
        target: Option<PathBuf>,
        /// Marketplace source to configure after install (repeatable)
        #[arg(long = "marketplace", value_name = "SOURCE")]
        marketplaces: Vec<String>,
        /// Plugin to install after install (repeatable)
        #[arg(long = "plugin", value_name = "NAME[@MARKETPLACE]")]
        plugins: Vec<String>,
    },
    /// Print the concrete version a token resolves to
    Resolve {
        /// Version token: a literal, stable, or latest
        #[arg(default_value = "stable")]
        version: String,
    },
    /// Print the cache key and fallback prefixes for a token
    #[command(name = "cache-key")]
    CacheKey {
        /// Version token: a literal, stable, or latest
        #[arg(default_value = "stable")]
        version: String,
    },
    /// Print the detected platform identifier
    Platform,
}
