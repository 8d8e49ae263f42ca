use std::ffi::OsString;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::config::InstallTarget;
use crate::download::{Downloader, HttpDownloader, SYNAPSE_ARCHIVE, SYNAPSE_URL};
use crate::log::Logger;
use crate::merge::{ensure_dir, merge_dirs, move_file, MergeReport};
use crate::platform::HostFamily;
use crate::process::{escape_spaces, extraction_invocation, CommandRunner, Invoker, StatusPolicy, SystemRunner, Tool};

/// Name of the distribution tool on the search path.
pub const STEAMCMD: &str = "steamcmd";
/// Steam application id of the dedicated server.
pub const APP_ID: &str = "996560";
/// Exit codes of `steamcmd +quit` that still mean steamcmd works.
pub const STEAMCMD_HEALTHY: StatusPolicy = StatusPolicy::Tolerate(&[0, 7]);
/// Assembly replaced by the loader.
pub const ASSEMBLY: &str = "Assembly-CSharp.dll";
/// Loader files directory, both in the archive and under the config directory.
pub const LOADER_DIR: &str = "Synapse";

/// Path of the game assembly under the binaries directory.
pub fn assembly_path(binaries: &Path) -> PathBuf {
    binaries.join("SCPSL_Data").join("Managed").join(ASSEMBLY)
}

/// `path` with `.bak` appended to its file name.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Arguments that install, update and validate the server into `dir`.
pub fn steamcmd_install_args(dir: &Path) -> Vec<String> {
    let dir = escape_spaces(dir);
    [
        "+force_install_dir",
        dir.as_str(),
        "+login",
        "anonymous",
        "+app_update",
        APP_ID,
        "validate",
        "+quit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Runs the install flows for one [`InstallTarget`].
pub struct Installer<'a> {
    target: &'a InstallTarget,
    log: &'a Logger,
    workdir: PathBuf,
    host: HostFamily,
    runner: Box<dyn CommandRunner + 'a>,
    downloader: Box<dyn Downloader + 'a>,
}

impl<'a> Installer<'a> {
    /// Creates an installer for the current host using real subprocesses and HTTP.
    pub fn new(target: &'a InstallTarget, log: &'a Logger, workdir: impl Into<PathBuf>) -> Self {
        Self {
            target,
            log,
            workdir: workdir.into(),
            host: HostFamily::current(),
            runner: Box::new(SystemRunner),
            downloader: Box::new(HttpDownloader::new()),
        }
    }

    pub fn with_host(mut self, host: HostFamily) -> Self {
        self.host = host;
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'a) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_downloader(mut self, downloader: impl Downloader + 'a) -> Self {
        self.downloader = Box::new(downloader);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn invoker(&self) -> Invoker<'_> {
        Invoker::new(self.runner.as_ref(), &self.host, &self.workdir, self.log)
    }

    fn steamcmd(&self) -> Tool {
        match &self.target.steamcmd {
            Some(program) => Tool::configured(program),
            None => Tool::named(STEAMCMD),
        }
    }

    /// Installs or updates the dedicated server with steamcmd.
    pub fn install_game(&self) -> Result<()> {
        self.log.info("Attempting to install game...");
        self.test_steamcmd()?;
        self.log.debug("SteamCMD seems to work!");
        self.log.info(format!(
            "Installing SCPSL_DEDICATED to {} ...",
            self.target.binaries.display()
        ));
        self.invoker()
            .invoke(
                &self.steamcmd(),
                &steamcmd_install_args(&self.target.binaries),
                StatusPolicy::Strict,
            )
            .context("Something went wrong calling SteamCMD")?;
        self.log.ok("Installed SCP:SL.");
        Ok(())
    }

    /// Checks that steamcmd can be started.
    pub fn test_steamcmd(&self) -> Result<()> {
        self.log.debug("Testing steamcmd availability...");
        self.invoker()
            .invoke(&self.steamcmd(), &["+quit".to_string()], STEAMCMD_HEALTHY)
            .context("SteamCMD is not available")?;
        Ok(())
    }

    /// Installs or updates the Synapse loader.
    ///
    /// Stops at the first failing step; files moved so far stay where they are.
    pub fn install_loader(&self) -> Result<()> {
        self.log.info("Attempting to install Synapse...");
        let archive = match &self.target.archive {
            Some(path) => path.clone(),
            None => self.download_loader()?,
        };
        self.extract(&archive)?;
        self.replace_assembly()?;
        self.install_loader_files()?;
        self.log.ok("Installed Synapse.");
        Ok(())
    }

    /// Downloads the loader archive into the working directory.
    pub fn download_loader(&self) -> Result<PathBuf> {
        self.log.info("Downloading Synapse...");
        let dest = self.workdir.join(SYNAPSE_ARCHIVE);
        let bytes = self.downloader.fetch(SYNAPSE_URL, &dest)?;
        self.log.debug(format!("Saved {} bytes as {}", bytes, dest.display()));
        Ok(dest)
    }

    /// Extracts `archive` into the working directory.
    pub fn extract(&self, archive: &Path) -> Result<()> {
        let (tool, args) = extraction_invocation(
            &self.host,
            self.target.unzip_cmd.as_deref(),
            &self.target.unzip_args,
            archive,
            self.log,
        );
        self.invoker()
            .invoke(&tool, &args, StatusPolicy::Strict)
            .context("Failed to unzip - your unzipper was presumably called with invalid arguments")?;
        Ok(())
    }

    /// Backs up the game assembly and puts the extracted one in its place.
    pub fn replace_assembly(&self) -> Result<()> {
        self.log.info("Moving assemblies...");
        let assembly = assembly_path(&self.target.binaries);
        let backup = backup_path(&assembly);
        std::fs::rename(&assembly, &backup).with_context(|| {
            format!(
                "Failed to rename {} - your installation is likely corrupt",
                assembly.display()
            )
        })?;
        move_file(&self.workdir.join(ASSEMBLY), &assembly)
            .context("Failed to move Assembly-CSharp.dll to game directory")?;
        self.log.info("Installed SynapseLoader.");
        Ok(())
    }

    /// Merges the extracted loader files into `<files>/Synapse`.
    pub fn install_loader_files(&self) -> Result<MergeReport> {
        let source = self.workdir.join(LOADER_DIR);
        let dest = self.target.files.join(LOADER_DIR);
        ensure_dir(&dest, self.log).context("Could not create Synapse directory")?;
        let report = merge_dirs(&source, &dest, self.target.on_conflict, self.log)?;
        std::fs::remove_dir(&source)
            .with_context(|| format!("Failed to remove directory {}", source.display()))?;
        self.log.info("Synapse is now installed.");
        Ok(report)
    }
}
