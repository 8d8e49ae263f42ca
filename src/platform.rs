//! Host detection and every piece of OS-dependent policy.
//!
//! Call sites never branch on the operating system themselves; they ask this
//! module which tool to run and where the bundled copy lives.

use std::path::{Path, PathBuf};

/// Directory next to the installer holding bundled copies of external tools.
pub const BUNDLED_DIR: &str = "bundled";

/// Family of the host operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFamily {
    Windows,
    Unix,
    /// Anything else, carrying the OS name for diagnostics.
    Other(String),
}

impl HostFamily {
    /// Returns the family of the host this binary was compiled for.
    pub fn current() -> Self {
        Self::from_consts(std::env::consts::FAMILY, std::env::consts::OS)
    }

    /// Maps `std::env::consts::{FAMILY, OS}` style values to a family.
    pub fn from_consts(family: &str, os: &str) -> Self {
        match family {
            "windows" => HostFamily::Windows,
            "unix" => HostFamily::Unix,
            _ => HostFamily::Other(os.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HostFamily::Windows => "windows",
            HostFamily::Unix => "unix",
            HostFamily::Other(os) => os,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostFamily::Windows)
    }
}

/// An archive extraction program and the flags placed before the archive path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTool {
    pub program: String,
    pub args: Vec<String>,
}

impl ExtractionTool {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Picks the extraction tool for a host family.
///
/// Unrecognized hosts get the Windows default; callers should warn about it.
pub fn default_extraction_tool(host: &HostFamily) -> ExtractionTool {
    match host {
        HostFamily::Unix => ExtractionTool::new("unzip", &["-o"]),
        HostFamily::Windows | HostFamily::Other(_) => ExtractionTool::new("7za", &["x", "-y"]),
    }
}

/// Location of the bundled copy of `tool`, if this host family uses one.
pub fn fallback_binary_path(host: &HostFamily, workdir: &Path, tool: &str) -> Option<PathBuf> {
    match host {
        HostFamily::Windows => Some(workdir.join(BUNDLED_DIR).join(format!("{tool}.exe"))),
        _ => None,
    }
}
