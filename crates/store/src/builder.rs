use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use index::{validate_word, IndexError, Record, MAX_DEFINITION_LEN};
use tracing::info;
use wordfile::WordFileReader;

use crate::format::tmp_path;
use crate::StoreError;

/// What a build produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub records: usize,
    /// Size of the index region, header included.
    pub index_size: u64,
    /// Size of the data region (the source file).
    pub data_size: u64,
}

impl BuildSummary {
    pub fn store_size(&self) -> u64 {
        self.index_size + self.data_size
    }
}

/// Builds store files from sorted `word,definition` source files.
///
/// The builder is stateless; all work happens in [`StoreBuilder::build`].
pub struct StoreBuilder {}

impl StoreBuilder {
    /// Builds the store at `store` from the source file at `source`.
    ///
    /// # Steps
    ///
    /// 1. Scan the source, recording each line's offset relative to the data
    ///    region ([`StoreBuilder::scan`]).
    /// 2. Size the index region from the records and shift every offset past
    ///    it, so offsets address the final file.
    /// 3. Write the index region to `index_path` (if given) and to the store,
    ///    followed by the verbatim source bytes.
    ///
    /// # Crash Safety
    ///
    /// Both outputs are written to `<path>.tmp`, fsynced, then renamed over
    /// the target. A reader holding the previous store open keeps reading it.
    ///
    /// # Errors
    ///
    /// Fails on malformed, unsorted or duplicate source lines, on words that
    /// cannot be indexed, and on any I/O failure. No target path is touched
    /// unless its temporary file was fully written.
    pub fn build(
        source: &Path,
        index_path: Option<&Path>,
        store: &Path,
    ) -> Result<BuildSummary, StoreError> {
        let (mut records, data_size) = Self::scan(source)?;

        let index_size = index::region_size(&records);
        for r in &mut records {
            r.offset += index_size;
        }
        let region = index::encode_region(&records);

        if let Some(index_path) = index_path {
            write_atomic(index_path, |w| w.write_all(&region))?;
        }

        write_atomic(store, |w| {
            w.write_all(&region)?;
            let mut src = File::open(source)?;
            let copied = io::copy(&mut src, w)?;
            if copied != data_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "source changed during build: scanned {} bytes, copied {}",
                        data_size, copied
                    ),
                ));
            }
            Ok(())
        })?;

        let summary = BuildSummary {
            records: records.len(),
            index_size,
            data_size,
        };
        info!(
            store = %store.display(),
            records = summary.records,
            index_size,
            data_size,
            "built store"
        );
        Ok(summary)
    }

    /// Reads the source and returns one record per line, with offsets
    /// relative to the start of the data region, plus the data size.
    pub fn scan(source: &Path) -> Result<(Vec<Record>, u64), StoreError> {
        let f = File::open(source)
            .map_err(|e| StoreError::io(format!("open source {}", source.display()), e))?;
        let mut lines = WordFileReader::from_reader(f).require_ascending();
        let mut records = Vec::new();

        while let Some(entry) = lines.next_entry()? {
            let word = entry.line.word;
            validate_word(&word)?;
            let def_len = entry.line.definition.len();
            if def_len > MAX_DEFINITION_LEN {
                return Err(IndexError::DefinitionTooLong { word, len: def_len }.into());
            }
            records.push(Record::new(word, entry.offset, def_len as u16));
        }

        Ok((records, lines.offset()))
    }
}

fn write_atomic<F>(path: &Path, fill: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let tmp = tmp_path(path);
    let result = (|| {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        let mut w = BufWriter::new(file);
        fill(&mut w)?;
        let file = w.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StoreError::io(format!("write {}", path.display()), e)
    })
}
