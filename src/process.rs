use std::path::{Path, PathBuf};
use std::process::Command;
use anyhow::{bail, Context, Result};
use crate::log::Logger;
use crate::platform::{default_extraction_tool, fallback_binary_path, HostFamily};

/// Exit status and captured streams of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr, as shown to the user.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end().is_empty(), self.stderr.trim_end().is_empty()) {
            (_, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
        }
    }
}

/// Runs an external program to completion.
pub trait CommandRunner {
    /// Blocks until `program` exits. Errors only when it could not be started.
    fn run(&self, program: &Path, args: &[String], workdir: &Path) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], workdir: &Path) -> std::io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .output()?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Which exit codes count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Only `0`.
    Strict,
    /// `0` plus the listed codes.
    Tolerate(&'static [i32]),
}

/// Returns whether `status` is a success under `policy`.
pub fn is_tolerated_status(status: Option<i32>, policy: StatusPolicy) -> bool {
    match (status, policy) {
        (Some(0), _) => true,
        (Some(code), StatusPolicy::Tolerate(codes)) => codes.contains(&code),
        _ => false,
    }
}

/// An external program to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Short name, used to locate the bundled copy.
    pub name: String,
    pub program: PathBuf,
    /// Set when the user picked the program; disables the bundled fallback.
    pub configured: bool,
}

impl Tool {
    /// A tool looked up on the search path by name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            program: PathBuf::from(name),
            configured: false,
        }
    }

    /// A tool the user configured explicitly.
    pub fn configured(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            program,
            configured: true,
        }
    }
}

/// Invokes external tools with the bundled fallback policy of the host.
pub struct Invoker<'a> {
    runner: &'a dyn CommandRunner,
    host: &'a HostFamily,
    workdir: &'a Path,
    log: &'a Logger,
}

impl<'a> Invoker<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        host: &'a HostFamily,
        workdir: &'a Path,
        log: &'a Logger,
    ) -> Self {
        Self { runner, host, workdir, log }
    }

    /// Runs `tool` with `args` and returns its combined output.
    ///
    /// If the first attempt fails on Windows and the tool was not configured
    /// by the user, the bundled copy is tried once with the same arguments.
    pub fn invoke(&self, tool: &Tool, args: &[String], policy: StatusPolicy) -> Result<String> {
        let primary = match self.attempt(&tool.program, args, policy) {
            Ok(output) => return Ok(output),
            Err(err) => err,
        };

        let fallback = match tool.configured {
            true => None,
            false => fallback_binary_path(self.host, self.workdir, &tool.name),
        };
        let Some(fallback) = fallback else {
            return Err(primary);
        };

        self.log.warn(format!(
            "Failed calling {} ({primary:#}), falling back to bundled {}.",
            tool.name,
            fallback.display()
        ));
        self.attempt(&fallback, args, policy)
            .with_context(|| format!("Bundled {} failed as well", tool.name))
    }

    fn attempt(&self, program: &Path, args: &[String], policy: StatusPolicy) -> Result<String> {
        self.log.debug(format!("Running {} ...", render_command(program, args)));
        let output = self
            .runner
            .run(program, args, self.workdir)
            .with_context(|| format!("Failed to start {}", program.display()))?;
        let combined = output.combined();
        if !is_tolerated_status(output.status, policy) {
            let status = match output.status {
                Some(code) => format!("exit code {code}"),
                None => "no exit code".to_string(),
            };
            bail!("{} failed with {status}\n{combined}", program.display());
        }
        if !combined.is_empty() {
            self.log.output(&combined);
        }
        Ok(combined)
    }
}

/// Renders a command line for log messages. Not meant to be re-parsed.
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Escapes spaces as `\ ` so the distribution tool reads the path as one value.
pub fn escape_spaces(path: &Path) -> String {
    path.to_string_lossy().replace(' ', "\\ ")
}

/// Builds the extraction tool and its argument list for `archive`.
///
/// Without a custom command the host default is used, and `custom_args` are
/// ignored. The archive path is always the last argument and is never split.
pub fn extraction_invocation(
    host: &HostFamily,
    custom_cmd: Option<&str>,
    custom_args: &[String],
    archive: &Path,
    log: &Logger,
) -> (Tool, Vec<String>) {
    let (tool, mut args) = match custom_cmd {
        None => {
            log.debug("Falling back to the default unzip command.");
            if let HostFamily::Other(os) = host {
                log.warn(format!(
                    "Your OS seems to be {os}, which is not natively supported. Falling back to 7za, if that doesn't work please specify a custom unzip command."
                ));
            }
            let default = default_extraction_tool(host);
            log.info(format!("Detected OS: {}. Using {} for unzip.", host.name(), default.program));
            (Tool::named(&default.program), default.args)
        }
        Some(cmd) => {
            log.debug(format!("Custom unzip: {cmd}"));
            if !custom_args.is_empty() {
                log.debug(format!("Custom args: {}", custom_args.join(" ")));
            }
            (Tool::configured(cmd), custom_args.to_vec())
        }
    };
    args.push(archive.to_string_lossy().into_owned());
    (tool, args)
}
