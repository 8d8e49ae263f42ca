use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use crate::log::Logger;

/// What to do when a file being merged already exists at the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Replace the destination file.
    #[default]
    Overwrite,
    /// Keep the destination file and drop the incoming one.
    Skip,
    /// Stop the merge.
    Error,
}

/// Counters collected while merging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub files_moved: usize,
    pub files_skipped: usize,
    pub dirs_created: usize,
    pub dirs_removed: usize,
}

/// Creates `path` and any missing parents. Returns `true` if it was created.
pub fn ensure_dir(path: &Path, log: &Logger) -> Result<bool> {
    log.debug(format!("Looking for {}", path.display()));
    if path.is_dir() {
        return Ok(false);
    }
    log.debug(format!("{} was not found. Creating...", path.display()));
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;
    Ok(true)
}

/// Moves every entry under `source` into `target`, mirroring subdirectories.
///
/// Subdirectories of `source` are removed once emptied; `source` itself is
/// left in place. Entries are processed in directory listing order.
pub fn merge_dirs(source: &Path, target: &Path, policy: ConflictPolicy, log: &Logger) -> Result<MergeReport> {
    log.info(format!("Merging {} into {} ...", source.display(), target.display()));
    let mut report = MergeReport::default();
    merge_into(source, target, policy, log, &mut report)?;
    log.debug(format!(
        "Merged {} files ({} skipped), created {} and removed {} directories",
        report.files_moved, report.files_skipped, report.dirs_created, report.dirs_removed
    ));
    Ok(report)
}

fn merge_into(
    source: &Path,
    target: &Path,
    policy: ConflictPolicy,
    log: &Logger,
    report: &mut MergeReport,
) -> Result<()> {
    let entries = fs::read_dir(source)
        .with_context(|| format!("Failed to list {}", source.display()))?;

    for (index, entry) in entries.enumerate() {
        let entry = entry.with_context(|| format!("Failed to list {}", source.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to inspect {}", entry.path().display()))?;
        let from = entry.path();
        let to = target.join(entry.file_name());

        if file_type.is_dir() {
            log.debug(format!("{index} - Found directory {}", from.display()));
            if ensure_dir(&to, log)? {
                report.dirs_created += 1;
            }
            merge_into(&from, &to, policy, log, report)?;
            fs::remove_dir(&from)
                .with_context(|| format!("Failed to remove directory {}", from.display()))?;
            report.dirs_removed += 1;
            continue;
        }

        log.debug(format!("{index} - Found file {}", from.display()));
        if to.exists() {
            match policy {
                ConflictPolicy::Overwrite => {}
                ConflictPolicy::Skip => {
                    log.info(format!("Keeping existing {}", to.display()));
                    fs::remove_file(&from)
                        .with_context(|| format!("Failed to remove {}", from.display()))?;
                    report.files_skipped += 1;
                    continue;
                }
                ConflictPolicy::Error => {
                    bail!("{} already exists", to.display());
                }
            }
        }
        move_file(&from, &to)?;
        log.debug(format!("{index} - Moved file {} to {}", from.display(), to.display()));
        report.files_moved += 1;
    }
    Ok(())
}

/// Renames `from` to `to`, replacing `to`. Falls back to copy and remove when
/// the two paths are on different filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            fs::copy(from, to)
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
            fs::remove_file(from)
                .with_context(|| format!("Failed to remove {}", from.display()))?;
            Ok(())
        }
        Err(err) => Err(err)
            .with_context(|| format!("Failed to move {} to {}", from.display(), to.display())),
    }
}
