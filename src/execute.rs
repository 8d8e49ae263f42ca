use std::io::{BufRead, Write};
use std::path::PathBuf;
use anyhow::{Context, Result};
use synapse_installer::prompt::{ask_yes_no, BANNER};
use synapse_installer::{HostFamily, InstallTarget, Installer, Logger, Settings};
use crate::cli::CLI;

/// Everything decided at startup. Nothing here changes afterwards.
pub struct Session {
    pub log: Logger,
    target: InstallTarget,
    workdir: PathBuf,
    scripted: bool,
    install_game: bool,
    install_synapse: bool,
}

impl Session {
    pub fn load(cli: CLI) -> Result<Session> {
        let workdir = std::env::current_dir()
            .context("Could not figure out current working directory")?;
        let flags = cli.settings();
        let (settings, source) = match Settings::discover(cli.config.as_deref(), &workdir)? {
            Some((path, file)) => (flags.or(file), Some(path)),
            None => (flags, None),
        };

        let log = settings.logger();
        if let Some(path) = source {
            log.debug(format!("Loaded settings from {}", path.display()));
        }
        let host = HostFamily::current();
        let target = settings.into_target(&workdir, &host, |key| std::env::var(key).ok(), &log);
        log.debug(format!("Game binaries: {}", target.binaries.display()));
        log.debug(format!("Config files: {}", target.files.display()));

        Ok(Session {
            log,
            target,
            workdir,
            scripted: cli.scripted,
            install_game: cli.install_game,
            install_synapse: cli.install_synapse,
        })
    }

    pub fn run(&self) -> Result<()> {
        if self.scripted {
            self.log.info("Running in scripted mode.");
            return self.install(self.install_game, self.install_synapse);
        }
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        self.interactive(&mut input, &mut output)
    }

    fn interactive<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<()> {
        writeln!(output, "{BANNER}\n")?;
        writeln!(output, "Game binaries: {}", self.target.binaries.display())?;
        writeln!(output, "Config files:  {}\n", self.target.files.display())?;

        let game = match self.install_game {
            true => true,
            false => ask_yes_no(input, output, "Install/Update SCP: Secret Laboratory?", false)?,
        };
        let synapse = match self.install_synapse {
            true => true,
            false => ask_yes_no(input, output, "Install/Update Synapse?", false)?,
        };
        self.install(game, synapse)
    }

    fn install(&self, game: bool, synapse: bool) -> Result<()> {
        let installer = Installer::new(&self.target, &self.log, &self.workdir);
        if game {
            installer.install_game()?;
        } else {
            self.log.info("Skipped - Game was not installed.");
        }
        if synapse {
            installer.install_loader()?;
        } else {
            self.log.info("Skipped - Synapse was not installed.");
        }
        Ok(())
    }
}
