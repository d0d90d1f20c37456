//! Dictionary lifecycle: build, refresh from a changelog, and query.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use store::{open_data_region, BuildSummary, FileRangeReader, StoreBuilder, StoreReader};
use tracing::{info, warn};
use wordfile::{merge, WordFileReader, WordFileWriter};

use crate::archive::Archiver;
use crate::config::DictConfig;

/// Builds the store and index from the configured source file.
pub fn build(config: &DictConfig) -> Result<BuildSummary> {
    let source = config.source_path();
    StoreBuilder::build(&source, Some(&config.index_path()), &config.store_path())
        .with_context(|| format!("build dictionary from {}", source.display()))
}

/// Outcome of a successful [`update`].
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Directory holding the retired generation.
    pub archive_dir: PathBuf,
    /// Words whose definition changed.
    pub updated: u64,
    pub build: BuildSummary,
    /// Archive generations removed by retention.
    pub pruned: Vec<PathBuf>,
}

/// Applies the pending changelog to the live dictionary.
///
/// # Steps
///
/// 1. Merge the live store's data region with the changelog into a new source
///    file inside a scratch directory under the data dir.
/// 2. Archive the current source, index and changelog (moved) and the store
///    (linked, so the live path stays valid).
/// 3. Move the merged source into place and rebuild the store from it.
/// 4. Prune old archive generations if a retention count is set.
///
/// A failed merge or archive leaves every live file untouched; the scratch
/// directory and its partial output are removed.
pub fn update(config: &DictConfig) -> Result<UpdateReport> {
    let changelog_path = config.changelog_path();
    let store_path = config.store_path();

    let scratch = tempfile::Builder::new()
        .prefix("tmp-dict-update-")
        .tempdir_in(&config.dir)
        .with_context(|| format!("create scratch directory in {}", config.dir.display()))?;
    let merged_path = scratch.path().join(&config.source_file);

    let changelog = WordFileReader::open(&changelog_path)
        .with_context(|| format!("open changelog {}", changelog_path.display()))?;
    let (_, store_lines) = open_data_region(&store_path)
        .with_context(|| format!("open store {}", store_path.display()))?;

    let mut out = WordFileWriter::create(&merged_path)
        .with_context(|| format!("create {}", merged_path.display()))?;
    let stats = merge(store_lines, changelog, &mut out).context("merge changelog into store")?;
    out.sync()
        .with_context(|| format!("sync {}", merged_path.display()))?;

    let source_path = config.source_path();
    let retire = [source_path.clone(), config.index_path(), changelog_path];
    let archiver = Archiver::new(config.archive_path(), config.archive_retention);
    let archive_dir = archiver.archive(&[store_path], &retire)?;

    if let Err(e) = fs::rename(&merged_path, &source_path) {
        if let Err(undo) = archiver.restore(&archive_dir, &retire) {
            warn!(archive = %archive_dir.display(), error = %undo, "restore after failed update");
        }
        return Err(e).with_context(|| {
            format!(
                "move {} to {}",
                merged_path.display(),
                source_path.display()
            )
        });
    }

    let summary = build(config)?;
    let pruned = archiver.prune()?;

    info!(
        updated = stats.updated,
        records = summary.records,
        archive = %archive_dir.display(),
        "dictionary updated"
    );

    Ok(UpdateReport {
        archive_dir,
        updated: stats.updated,
        build: summary,
        pruned,
    })
}

/// A queryable dictionary pinned to the store generation it opened.
///
/// Refreshes rename a new store over the path; this handle keeps reading the
/// generation it opened until [`Dictionary::reopen`] is called.
pub struct Dictionary {
    config: DictConfig,
    reader: StoreReader<FileRangeReader>,
}

impl Dictionary {
    /// Opens the dictionary, building the store first if it does not exist.
    pub fn open(config: DictConfig) -> Result<Self> {
        if !config.store_exists() {
            info!(store = %config.store_path().display(), "store missing, building");
            build(&config)?;
        }
        let reader = open_reader(&config)?;
        Ok(Self { config, reader })
    }

    /// Returns the definition of `word`, or `None` if it is not in the dictionary.
    pub fn query(&self, word: &str) -> Result<Option<String>> {
        self.reader
            .query(word)
            .with_context(|| format!("look up {:?}", word))
    }

    /// Switches to the store generation currently at the configured path.
    pub fn reopen(&mut self) -> Result<()> {
        self.reader = open_reader(&self.config)?;
        Ok(())
    }

    pub fn reader(&self) -> &StoreReader<FileRangeReader> {
        &self.reader
    }
}

fn open_reader(config: &DictConfig) -> Result<StoreReader<FileRangeReader>> {
    let path = config.store_path();
    StoreReader::open_path(&path).with_context(|| format!("open store {}", path.display()))
}
