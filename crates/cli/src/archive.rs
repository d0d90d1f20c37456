//! Retired generations of dictionary files.
//!
//! Each refresh moves the files it replaces into `archive/<timestamp>/`. The
//! timestamp is UTC with millisecond precision, so generation directories sort
//! by name in creation order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const MAX_ATTEMPTS: u32 = 1000;

pub struct Archiver {
    root: PathBuf,
    retention: Option<usize>,
}

impl Archiver {
    pub fn new(root: impl Into<PathBuf>, retention: Option<usize>) -> Self {
        Self {
            root: root.into(),
            retention,
        }
    }

    /// Retires one generation into a fresh archive directory.
    ///
    /// Files in `keep_live` are hard-linked (or copied when linking is not
    /// possible) so their path stays valid until a replacement is renamed over
    /// it. Files in `retire` are moved. Returns the new directory.
    ///
    /// Every file must exist before anything is touched. If a later step
    /// fails, retired files are moved back and the directory is removed.
    pub fn archive(&self, keep_live: &[PathBuf], retire: &[PathBuf]) -> Result<PathBuf> {
        for path in keep_live.iter().chain(retire) {
            if !path.is_file() {
                bail!("cannot archive {}: no such file", path.display());
            }
        }

        let dir = self.create_generation()?;
        if let Err(err) = fill_generation(&dir, keep_live, retire) {
            if let Err(undo) = self.restore(&dir, retire) {
                warn!(dir = %dir.display(), error = %undo, "archive rollback failed");
            }
            return Err(err);
        }

        info!(dir = %dir.display(), "archived generation");
        Ok(dir)
    }

    /// Moves retired files in `dir` back to their original paths and removes
    /// `dir`. Files that were never moved are skipped.
    pub fn restore(&self, dir: &Path, retire: &[PathBuf]) -> Result<()> {
        for path in retire.iter().rev() {
            let archived = dir.join(file_name(path)?);
            if archived.is_file() && !path.exists() {
                fs::rename(&archived, path).with_context(|| {
                    format!("restore {} to {}", archived.display(), path.display())
                })?;
            }
        }
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
        info!(dir = %dir.display(), "restored archived generation");
        Ok(())
    }

    /// Archived generation directories, oldest first.
    pub fn generations(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("list {}", self.root.display()));
            }
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("list {}", self.root.display()))?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Removes the oldest generations beyond the retention count.
    pub fn prune(&self) -> Result<Vec<PathBuf>> {
        let Some(keep) = self.retention else {
            return Ok(Vec::new());
        };
        let mut dirs = self.generations()?;
        let excess = dirs.len().saturating_sub(keep);
        let pruned: Vec<PathBuf> = dirs.drain(..excess).collect();
        for dir in &pruned {
            fs::remove_dir_all(dir).with_context(|| format!("prune {}", dir.display()))?;
        }
        if !pruned.is_empty() {
            info!(pruned = pruned.len(), kept = dirs.len(), "pruned archive");
        }
        Ok(pruned)
    }

    fn create_generation(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create archive root {}", self.root.display()))?;

        let stamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        for attempt in 0..MAX_ATTEMPTS {
            let name = match attempt {
                0 => stamp.clone(),
                n => format!("{}-{:03}", stamp, n),
            };
            let dir = self.root.join(name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("create {}", dir.display()));
                }
            }
        }
        bail!(
            "no free archive directory for {} under {}",
            stamp,
            self.root.display()
        )
    }
}

fn fill_generation(dir: &Path, keep_live: &[PathBuf], retire: &[PathBuf]) -> Result<()> {
    for path in keep_live {
        let target = dir.join(file_name(path)?);
        if fs::hard_link(path, &target).is_err() {
            fs::copy(path, &target)
                .with_context(|| format!("archive {} to {}", path.display(), target.display()))?;
        }
    }
    for path in retire {
        let target = dir.join(file_name(path)?);
        fs::rename(path, &target)
            .with_context(|| format!("move {} to {}", path.display(), target.display()))?;
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .with_context(|| format!("{} has no file name", path.display()))
}
