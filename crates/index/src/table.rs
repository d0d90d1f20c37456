use std::collections::BTreeMap;

use crate::record::{decode_header, decode_records, ParseMode, Record, HEADER_BYTES};
use crate::IndexError;

/// In-memory map from word to its [`Record`].
///
/// The table has no bearing on the on-disk record order; it only answers
/// point lookups. Inserting a word twice keeps the last record.
#[derive(Debug, Default, Clone)]
pub struct IndexTable {
    map: BTreeMap<String, Record>,
}

impl IndexTable {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Builds a table from records, last write wins on duplicate words.
    pub fn build<I: IntoIterator<Item = Record>>(records: I) -> Self {
        let mut table = Self::new();
        for r in records {
            table.insert(r);
        }
        table
    }

    /// Builds a table from a complete index region (header included).
    ///
    /// The header's size bounds the records read; bytes beyond it are ignored,
    /// so the full store file may be passed as well.
    pub fn from_region(region: &[u8], mode: ParseMode) -> Result<Self, IndexError> {
        let size = decode_header(region)?;
        let end = usize::try_from(size).map_err(|_| IndexError::Truncated(region.len()))?;
        if end < HEADER_BYTES as usize || end > region.len() {
            return Err(IndexError::Truncated(region.len()));
        }
        let records = decode_records(&region[HEADER_BYTES as usize..end], mode)?;
        Ok(Self::build(records))
    }

    /// Inserts a record, returning the one it replaced.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.map.insert(record.word.clone(), record)
    }

    pub fn get(&self, word: &str) -> Option<&Record> {
        self.map.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Records in ascending word order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.map.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::encode_region;
    use anyhow::Result;

    #[test]
    fn build_and_get() {
        let table = IndexTable::build(vec![
            Record::new("b", 30, 2),
            Record::new("a", 10, 1),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some(&Record::new("a", 10, 1)));
        assert!(table.get("c").is_none());
        assert!(table.contains("b"));
    }

    #[test]
    fn duplicate_word_last_wins() {
        let mut table = IndexTable::new();
        assert!(table.insert(Record::new("w", 1, 1)).is_none());
        let replaced = table.insert(Record::new("w", 2, 2));
        assert_eq!(replaced, Some(Record::new("w", 1, 1)));
        assert_eq!(table.get("w").map(|r| r.offset), Some(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn iter_is_sorted() {
        let table = IndexTable::build(vec![
            Record::new("z", 0, 0),
            Record::new("a", 0, 0),
            Record::new("m", 0, 0),
        ]);
        let words: Vec<_> = table.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["a", "m", "z"]);
    }

    #[test]
    fn from_region_ignores_trailing_data() -> Result<()> {
        let records = vec![Record::new("cat", 40, 3), Record::new("dog", 50, 4)];
        let mut file = encode_region(&records);
        file.extend_from_slice(b"cat,fur\ndog,bark\n");

        let table = IndexTable::from_region(&file, ParseMode::Strict)?;
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("dog"), Some(&Record::new("dog", 50, 4)));
        Ok(())
    }

    #[test]
    fn from_region_empty_index() -> Result<()> {
        let table = IndexTable::from_region(&encode_region(&[]), ParseMode::Strict)?;
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn from_region_rejects_short_buffer() {
        let records = vec![Record::new("cat", 40, 3)];
        let region = encode_region(&records);
        let err = IndexTable::from_region(&region[..region.len() - 1], ParseMode::Tolerant)
            .unwrap_err();
        assert!(matches!(err, IndexError::Truncated(_)));

        let err = IndexTable::from_region(&[0, 0, 0, 0, 0, 0, 0, 3], ParseMode::Tolerant)
            .unwrap_err();
        assert!(matches!(err, IndexError::Truncated(8)));
    }
}
