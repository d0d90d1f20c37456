use std::path::PathBuf;

/// Where a dictionary keeps its files.
///
/// Every file name is resolved relative to `dir`.
#[derive(Debug, Clone)]
pub struct DictConfig {
    /// Data directory holding the live generation.
    pub dir: PathBuf,

    /// Sorted `word,definition` source (default: `words.dat`)
    pub source_file: String,

    /// Standalone copy of the index region (default: `index.dat`)
    pub index_file: String,

    /// Queryable store, index followed by data (default: `dict.dat`)
    pub store_file: String,

    /// Pending updates consumed by the next refresh (default: `changelog.dat`)
    pub changelog_file: String,

    /// Directory of retired generations (default: `archive`)
    pub archive_dir: String,

    /// Number of archived generations to keep; `None` keeps all of them.
    pub archive_retention: Option<usize>,
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            source_file: "words.dat".to_string(),
            index_file: "index.dat".to_string(),
            store_file: "dict.dat".to_string(),
            changelog_file: "changelog.dat".to_string(),
            archive_dir: "archive".to_string(),
            archive_retention: None,
        }
    }
}

impl DictConfig {
    /// Create a new config with the given data directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    pub fn source_file(mut self, name: impl Into<String>) -> Self {
        self.source_file = name.into();
        self
    }

    pub fn store_file(mut self, name: impl Into<String>) -> Self {
        self.store_file = name.into();
        self
    }

    pub fn changelog_file(mut self, name: impl Into<String>) -> Self {
        self.changelog_file = name.into();
        self
    }

    /// Keep at most `count` archived generations
    pub fn archive_retention(mut self, count: Option<usize>) -> Self {
        self.archive_retention = count;
        self
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(&self.source_file)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(&self.index_file)
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(&self.store_file)
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.dir.join(&self.changelog_file)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.join(&self.archive_dir)
    }

    pub fn store_exists(&self) -> bool {
        self.store_path().is_file()
    }
}
