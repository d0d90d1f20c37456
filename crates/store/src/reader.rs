use std::path::Path;

use index::{decode_header, decode_records, IndexTable, ParseMode, HEADER_BYTES};
use tracing::info;

use crate::remote::{FileRangeReader, RangeRead};
use crate::StoreError;

/// Answers point lookups against a built store.
///
/// On [`open`](StoreReader::open) the index region is fetched and decoded into
/// an [`IndexTable`]. Each [`query`](StoreReader::query) then costs one ranged
/// read of exactly the definition bytes. The reader performs no writes, so a
/// shared `StoreReader` may serve concurrent queries.
pub struct StoreReader<R: RangeRead> {
    reader: R,
    table: IndexTable,
    index_size: u64,
}

impl StoreReader<FileRangeReader> {
    /// Opens a local store file and loads its index.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open(FileRangeReader::open(path)?)
    }
}

impl<R: RangeRead> StoreReader<R> {
    /// Loads the index, skipping records that do not decode.
    pub fn open(reader: R) -> Result<Self, StoreError> {
        Self::open_with_mode(reader, ParseMode::Tolerant)
    }

    /// Loads the index with an explicit parse mode.
    ///
    /// # Errors
    ///
    /// Fails if the header or index region cannot be read, if the header is
    /// smaller than itself, or (in [`ParseMode::Strict`]) on the first
    /// corrupt record.
    pub fn open_with_mode(reader: R, mode: ParseMode) -> Result<Self, StoreError> {
        let header = reader.read_range(0, HEADER_BYTES - 1)?;
        let index_size = decode_header(&header)?;
        if index_size < HEADER_BYTES {
            return Err(StoreError::Corrupt(format!(
                "index size {} is smaller than the header",
                index_size
            )));
        }

        let records = if index_size > HEADER_BYTES {
            let body = reader.read_range(HEADER_BYTES, index_size - 1)?;
            decode_records(&body, mode)?
        } else {
            Vec::new()
        };

        let table = IndexTable::build(records);
        info!(index_size, records = table.len(), "loaded store index");

        Ok(Self {
            reader,
            table,
            index_size,
        })
    }

    /// Looks up the definition of `word`.
    ///
    /// Returns `Ok(None)` when the word is not indexed. A failed read is an
    /// error, never a miss.
    pub fn query(&self, word: &str) -> Result<Option<String>, StoreError> {
        let Some(record) = self.table.get(word) else {
            return Ok(None);
        };
        let range = record
            .definition_range()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let Some((start, end)) = range else {
            return Ok(Some(String::new()));
        };

        let bytes = self.reader.read_range(start, end)?;
        String::from_utf8(bytes).map(Some).map_err(|_| {
            StoreError::Corrupt(format!("definition of {:?} is not valid utf-8", word))
        })
    }

    pub fn contains(&self, word: &str) -> bool {
        self.table.contains(word)
    }

    /// Size of the index region, header included.
    pub fn index_size(&self) -> u64 {
        self.index_size
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Indexed words in ascending order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.table.iter().map(|r| r.word.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryBlobStore, RemoteRangeReader};
    use crate::StoreBuilder;
    use anyhow::Result;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    const WORDS: &str = "apple,a red fruit\n\
                         banana,a long, yellow fruit\n\
                         cherry,\n\
                         date,sweet \u{e9}dible fruit\n";

    fn build(dir: &TempDir, contents: &str) -> Result<PathBuf> {
        let src = dir.path().join("words.dat");
        fs::write(&src, contents)?;
        let store = dir.path().join("dict.dat");
        StoreBuilder::build(&src, None, &store)?;
        Ok(store)
    }

    #[test]
    fn query_every_word() -> Result<()> {
        let dir = tempdir()?;
        let reader = StoreReader::open_path(build(&dir, WORDS)?)?;

        assert_eq!(reader.len(), 4);
        assert_eq!(reader.query("apple")?.as_deref(), Some("a red fruit"));
        assert_eq!(
            reader.query("banana")?.as_deref(),
            Some("a long, yellow fruit")
        );
        assert_eq!(reader.query("cherry")?.as_deref(), Some(""));
        assert_eq!(
            reader.query("date")?.as_deref(),
            Some("sweet \u{e9}dible fruit")
        );
        Ok(())
    }

    #[test]
    fn missing_word_is_none() -> Result<()> {
        let dir = tempdir()?;
        let reader = StoreReader::open_path(build(&dir, WORDS)?)?;
        assert!(reader.query("durian")?.is_none());
        assert!(reader.query("").is_ok());
        assert!(!reader.contains("durian"));
        Ok(())
    }

    #[test]
    fn empty_store_answers_none() -> Result<()> {
        let dir = tempdir()?;
        let reader = StoreReader::open_path(build(&dir, "")?)?;
        assert!(reader.is_empty());
        assert_eq!(reader.index_size(), 8);
        assert!(reader.query("anything")?.is_none());
        Ok(())
    }

    #[test]
    fn remote_and_local_agree() -> Result<()> {
        let dir = tempdir()?;
        let path = build(&dir, WORDS)?;
        let local = StoreReader::open_path(&path)?;

        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("dicts/dict.dat", fs::read(&path)?);
        let remote = StoreReader::open(RemoteRangeReader::new(blobs, "dicts/dict.dat"))?;

        assert_eq!(local.index_size(), remote.index_size());
        assert_eq!(
            local.words().collect::<Vec<_>>(),
            remote.words().collect::<Vec<_>>()
        );
        for word in ["apple", "banana", "cherry", "date", "missing"] {
            assert_eq!(local.query(word)?, remote.query(word)?);
        }
        Ok(())
    }

    #[test]
    fn failed_read_is_error_not_miss() -> Result<()> {
        let dir = tempdir()?;
        let path = build(&dir, WORDS)?;
        let bytes = fs::read(&path)?;

        // Serve the index but cut the data region short.
        let blobs = MemoryBlobStore::new();
        blobs.put("dict", bytes[..bytes.len() - 10].to_vec());
        let reader = StoreReader::open(RemoteRangeReader::new(blobs, "dict"))?;

        assert!(reader.query("apple")?.is_some());
        assert!(matches!(
            reader.query("date"),
            Err(StoreError::Fetch { .. })
        ));
        Ok(())
    }

    #[test]
    fn tolerant_open_skips_corrupt_records() -> Result<()> {
        let dir = tempdir()?;
        let path = build(&dir, "ant,insect\nbee,buzz\n")?;
        let mut bytes = fs::read(&path)?;
        // Break the separator between the first record's offset and length.
        bytes[8 + 3 + 9] = b'?';

        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put("dict", bytes);

        let tolerant = StoreReader::open(RemoteRangeReader::new(blobs.clone(), "dict"))?;
        assert!(tolerant.query("ant")?.is_none());
        assert_eq!(tolerant.query("bee")?.as_deref(), Some("buzz"));

        let strict = StoreReader::open_with_mode(
            RemoteRangeReader::new(blobs, "dict"),
            ParseMode::Strict,
        );
        assert!(matches!(strict, Err(StoreError::Index(_))));
        Ok(())
    }

    #[test]
    fn oversized_header_is_error_not_abort() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("dict.dat");
        let mut bytes = (1u64 << 62).to_be_bytes().to_vec();
        bytes.extend_from_slice(b"a,1\n");
        fs::write(&path, &bytes)?;

        assert!(matches!(
            StoreReader::open_path(&path),
            Err(StoreError::Fetch { .. })
        ));

        let blobs = MemoryBlobStore::new();
        blobs.put("dict", bytes);
        assert!(matches!(
            StoreReader::open(RemoteRangeReader::new(blobs, "dict")),
            Err(StoreError::Fetch { .. })
        ));
        Ok(())
    }

    #[test]
    fn overflowing_offset_is_corrupt_not_panic() -> Result<()> {
        let dir = tempdir()?;
        let path = build(&dir, "ant,insect\n")?;
        let mut bytes = fs::read(&path)?;
        // The record's offset follows the header, the word and its ':'.
        bytes[8 + 3 + 1..8 + 3 + 1 + 8].fill(0xff);
        fs::write(&path, &bytes)?;

        let reader = StoreReader::open_path(&path)?;
        assert!(reader.contains("ant"));
        assert!(matches!(reader.query("ant"), Err(StoreError::Corrupt(_))));
        Ok(())
    }

    #[test]
    fn truncated_header_is_error() {
        let blobs = MemoryBlobStore::new();
        blobs.put("dict", vec![0, 0, 0]);
        assert!(StoreReader::open(RemoteRangeReader::new(blobs, "dict")).is_err());
    }

    #[test]
    fn concurrent_queries() -> Result<()> {
        let dir = tempdir()?;
        let contents: String = (0..500)
            .map(|i| format!("word{:04},definition number {}\n", i, i))
            .collect();
        let reader = Arc::new(StoreReader::open_path(build(&dir, &contents)?)?);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let reader = Arc::clone(&reader);
                std::thread::spawn(move || {
                    for i in (t..500).step_by(4) {
                        let def = reader.query(&format!("word{:04}", i)).unwrap();
                        assert_eq!(def, Some(format!("definition number {}", i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        Ok(())
    }
}
