//! # SynapseInstaller Core Library
//!
//! This crate contains the logic behind the `synapse-installer` tool, which installs and
//! updates an SCP: Secret Laboratory dedicated server through `steamcmd` and overlays the
//! Synapse loader onto it.
//!
//! Nothing in here terminates the process. Every step returns an [`anyhow::Result`] and the
//! binary decides what to do with failures.
//!
//! ## Modules Overview
//! - [`config`] – `installer.toml` settings and the resolved [`InstallTarget`]
//! - [`installer`] – The game and loader install flows
//! - [`process`] – Running external tools, with the bundled fallback on Windows
//! - [`merge`] – Moving an extracted directory tree into an existing one
//! - [`download`] – Fetching the loader archive
//! - [`paths`] – Resolving `./` and `~/` paths
//! - [`platform`] – Host family detection and OS-specific tool choices
//! - [`log`] – Leveled, optionally colored console logging
//! - [`prompt`] – Questions asked in interactive mode


pub mod config;
pub mod download;
pub mod installer;
pub mod log;
pub mod merge;
pub mod paths;
pub mod platform;
pub mod process;
pub mod prompt;

pub use config::*;
pub use download::*;
pub use installer::*;
pub use log::{Level, Logger};
pub use merge::*;
pub use paths::*;
pub use platform::*;
pub use process::*;
