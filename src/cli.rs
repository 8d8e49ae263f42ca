use std::path::PathBuf;
use clap::Parser;
use synapse_installer::{ConflictPolicy, Settings};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// No interaction will be required to install
    #[clap(long)]
    pub(crate) scripted: bool,
    /// How verbose output should be. Lower number = more verbose
    #[clap(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub(crate) verbosity: Option<u8>,
    /// Disable ANSI colors
    #[clap(long)]
    pub(crate) no_color: bool,
    /// Where the game binaries are located [default: ./SCPSL_DEDICATEDSERVER/]
    #[clap(long)]
    pub(crate) binaries: Option<String>,
    /// Where the config files are located [default: ~/.config/]
    #[clap(long)]
    pub(crate) files: Option<String>,
    /// Install or update SCP: Secret Laboratory
    #[clap(long)]
    pub(crate) install_game: bool,
    /// Install or update Synapse
    #[clap(long)]
    pub(crate) install_synapse: bool,
    /// An already downloaded Synapse.zip
    #[clap(long, value_name = "PATH")]
    pub(crate) synapse_zip: Option<String>,
    /// Custom unzip command
    #[clap(long)]
    pub(crate) unzip_cmd: Option<String>,
    /// Argument for the custom unzip command, passed before the archive. Repeatable
    #[clap(long = "unzip-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) unzip_args: Vec<String>,
    /// Custom steamcmd executable. Disables the bundled fallback
    #[clap(long, value_name = "PATH")]
    pub(crate) steamcmd: Option<String>,
    /// What to do with config files that already exist [default: overwrite]
    #[clap(long, value_enum)]
    pub(crate) on_conflict: Option<ConflictPolicy>,
    /// Settings file to use instead of installer.toml
    #[clap(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
}

impl CLI {
    /// Settings given on the command line. Unset flags stay `None`.
    pub fn settings(&self) -> Settings {
        Settings {
            binaries: self.binaries.clone(),
            files: self.files.clone(),
            synapse_zip: self.synapse_zip.clone(),
            unzip_cmd: self.unzip_cmd.clone(),
            unzip_args: match self.unzip_args.is_empty() {
                true => None,
                false => Some(self.unzip_args.clone()),
            },
            steamcmd: self.steamcmd.clone(),
            on_conflict: self.on_conflict,
            verbosity: self.verbosity,
            color: match self.no_color {
                true => Some(false),
                false => None,
            },
        }
    }
}
