//! # Index
//!
//! Index records and the in-memory word table for the worddict store format.
//!
//! A store file is prefixed by its **index region**: an 8-byte big-endian size
//! header followed by one serialized [`Record`] per word. Each record tells the
//! query path where a word's `word,definition` line begins and how long the
//! definition is, so a lookup costs one map probe plus one ranged read.
//!
//! ## Record layout
//!
//! ```text
//! word | ':' | offset (u64 BE) | ':' | def_len (u16 BE) | '\n'
//! ```
//!
//! ## Region layout
//!
//! ```text
//! region_size (u64 BE, header included) | record | record | ...
//! ```
//!
//! ## Example
//! ```rust
//! use index::{IndexTable, ParseMode, Record};
//!
//! let records = vec![Record::new("cat", 0, 6), Record::new("dog", 11, 5)];
//! let region = index::encode_region(&records);
//! assert_eq!(region.len() as u64, index::region_size(&records));
//!
//! let table = IndexTable::from_region(&region, ParseMode::Strict).unwrap();
//! assert_eq!(table.get("dog").unwrap().offset, 11);
//! ```

mod record;
mod table;

pub use record::{
    decode_header, decode_records, encode_header, encode_region, region_size, validate_word,
    ParseMode, Record, HEADER_BYTES, MAX_DEFINITION_LEN, RECORD_OVERHEAD,
};
pub use table::IndexTable;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("corrupt index record at byte {pos}: {detail}")]
    Corrupt { pos: usize, detail: String },
    #[error("invalid word {word:?}: {reason}")]
    InvalidWord { word: String, reason: &'static str },
    #[error("definition of {word:?} is {len} bytes, limit is 65535")]
    DefinitionTooLong { word: String, len: usize },
    #[error("record for {word:?} has offset {offset} past the addressable range")]
    OffsetOverflow { word: String, offset: u64 },
    #[error("index region too short: {0} bytes")]
    Truncated(usize),
}
