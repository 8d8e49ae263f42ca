use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use crate::log::{Logger, DEFAULT_VERBOSITY};
use crate::merge::ConflictPolicy;
use crate::paths::{resolve_path, DEFAULT_BINARIES, DEFAULT_FILES};
use crate::platform::HostFamily;

/// Name of the settings file looked up in the working and config directories.
pub const SETTINGS_FILE: &str = "installer.toml";

/// Installer settings, as read from `installer.toml` or collected from flags.
///
/// Every field is optional so layers can be stacked with [`Settings::or`].
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Game binaries directory.
    pub binaries: Option<String>,
    /// Config files directory.
    pub files: Option<String>,
    /// Pre-downloaded `Synapse.zip`.
    pub synapse_zip: Option<String>,
    /// Custom unzip program.
    pub unzip_cmd: Option<String>,
    /// Arguments for the custom unzip program, placed before the archive path.
    pub unzip_args: Option<Vec<String>>,
    /// Custom steamcmd program.
    pub steamcmd: Option<String>,
    pub on_conflict: Option<ConflictPolicy>,
    pub verbosity: Option<u8>,
    pub color: Option<bool>,
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Could not parse settings file {}", path.display()))
    }

    /// Saves the settings in pretty TOML format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Finds and loads the settings file.
    ///
    /// An explicit path must exist. Otherwise the working directory is tried
    /// first, then the per-user config directory; finding neither is fine.
    pub fn discover(explicit: Option<&Path>, workdir: &Path) -> Result<Option<(PathBuf, Settings)>> {
        if let Some(path) = explicit {
            return Ok(Some((path.to_path_buf(), Settings::load(path)?)));
        }
        let mut candidates = vec![workdir.join(SETTINGS_FILE)];
        if let Ok(dir) = get_global_config_dir() {
            candidates.push(dir.join(SETTINGS_FILE));
        }
        for candidate in candidates {
            if candidate.is_file() {
                let settings = Settings::load(&candidate)?;
                return Ok(Some((candidate, settings)));
            }
        }
        Ok(None)
    }

    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            binaries: self.binaries.or(fallback.binaries),
            files: self.files.or(fallback.files),
            synapse_zip: self.synapse_zip.or(fallback.synapse_zip),
            unzip_cmd: self.unzip_cmd.or(fallback.unzip_cmd),
            unzip_args: self.unzip_args.or(fallback.unzip_args),
            steamcmd: self.steamcmd.or(fallback.steamcmd),
            on_conflict: self.on_conflict.or(fallback.on_conflict),
            verbosity: self.verbosity.or(fallback.verbosity),
            color: self.color.or(fallback.color),
        }
    }

    /// Builds the logger described by these settings.
    pub fn logger(&self) -> Logger {
        Logger::new(
            self.verbosity.unwrap_or(DEFAULT_VERBOSITY),
            self.color.unwrap_or(true),
        )
    }

    /// Resolves all paths and freezes the settings into an [`InstallTarget`].
    pub fn into_target<F>(self, cwd: &Path, host: &HostFamily, env: F, log: &Logger) -> InstallTarget
    where
        F: Fn(&str) -> Option<String>,
    {
        let binaries = self.binaries.as_deref().unwrap_or(DEFAULT_BINARIES);
        let files = self.files.as_deref().unwrap_or(DEFAULT_FILES);
        InstallTarget {
            binaries: resolve_path(binaries, cwd, host, &env, log),
            files: resolve_path(files, cwd, host, &env, log),
            archive: self
                .synapse_zip
                .filter(|p| !p.is_empty())
                .map(|p| resolve_path(&p, cwd, host, &env, log)),
            unzip_cmd: self.unzip_cmd.filter(|c| !c.is_empty()),
            unzip_args: self.unzip_args.unwrap_or_default(),
            steamcmd: self.steamcmd.filter(|c| !c.is_empty()).map(PathBuf::from),
            on_conflict: self.on_conflict.unwrap_or_default(),
        }
    }
}

/// Where and how to install. Built once at startup and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Game binaries directory.
    pub binaries: PathBuf,
    /// Config files directory; the loader files end up in `<files>/Synapse`.
    pub files: PathBuf,
    /// Pre-downloaded loader archive. Downloaded when absent.
    pub archive: Option<PathBuf>,
    pub unzip_cmd: Option<String>,
    pub unzip_args: Vec<String>,
    pub steamcmd: Option<PathBuf>,
    pub on_conflict: ConflictPolicy,
}

/// Per-user config directory of the installer.
pub fn get_global_config_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("eu", "SynapseSL", "synapse-installer")
        .ok_or_else(|| anyhow!("Could not get project directories"))?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
