use std::path::{Path, PathBuf};
use crate::log::Logger;
use crate::platform::HostFamily;

/// Prefix for paths relative to the working directory.
pub const CWD_MARKER: &str = "./";
/// Prefix for paths relative to the user's home directory.
pub const HOME_MARKER: &str = "~/";
/// Default game binaries location.
pub const DEFAULT_BINARIES: &str = "./SCPSL_DEDICATEDSERVER/";
/// Default config files location. On Windows this maps to `%APPDATA%/Synapse/`.
pub const DEFAULT_FILES: &str = "~/.config/";

/// Resolves a user supplied path against the working directory and the
/// home directory of the current user.
///
/// Environment lookups go through `env` so callers decide where variables
/// come from. Resolution is best effort: an unsupported host leaves `~/`
/// paths untouched and only warns.
pub fn resolve_path<F>(
    raw: &str,
    cwd: &Path,
    host: &HostFamily,
    env: F,
    log: &Logger,
) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(rest) = raw.strip_prefix(CWD_MARKER) {
        return cwd.join(rest);
    }

    if let Some(rest) = raw.strip_prefix(HOME_MARKER) {
        return match host {
            HostFamily::Windows => {
                log.info("Detected OS: Windows. Adjusting path.");
                if raw == DEFAULT_FILES {
                    log.info("Found the default config directory, using %APPDATA% instead.");
                    let app_data = lookup(&env, "APPDATA", log);
                    PathBuf::from(format!("{}/Synapse/", trim_separator(&app_data)))
                } else {
                    log.warn("Found a UNIX home directive on Windows. Using %USERPROFILE%, this might cause problems later on.");
                    let profile = lookup(&env, "USERPROFILE", log);
                    PathBuf::from(format!("{}/{}", trim_separator(&profile), rest))
                }
            }
            HostFamily::Unix => {
                log.info("Detected OS: Unix. Adjusting path.");
                let home = lookup(&env, "HOME", log);
                PathBuf::from(format!("{}/{}", trim_separator(&home), rest))
            }
            HostFamily::Other(os) => {
                log.warn(format!(
                    "Detected OS to be {os}, which is not natively supported (expected Windows or Unix). '{raw}' was left unresolved."
                ));
                PathBuf::from(raw)
            }
        };
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Same as [`resolve_path`], reading variables from the process environment.
pub fn resolve_path_from_env(raw: &str, cwd: &Path, host: &HostFamily, log: &Logger) -> PathBuf {
    resolve_path(raw, cwd, host, |key| std::env::var(key).ok(), log)
}

fn lookup<F>(env: &F, key: &str, log: &Logger) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env(key).unwrap_or_else(|| {
        log.warn(format!("Environment variable {key} is not set."));
        String::new()
    })
}

fn trim_separator(s: &str) -> &str {
    s.trim_end_matches(['/', '\\'])
}
