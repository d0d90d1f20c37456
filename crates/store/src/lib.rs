//! # Store
//!
//! Immutable, single-file dictionary stores.
//!
//! A store is built once from a sorted source file and never modified; a
//! refresh builds a replacement and renames it over the old one. Lookups load
//! the index region into memory and then need one ranged read per word, which
//! works the same over a local file handle or a remote blob.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │ HEADER                                            │
//! │ index_size (u64 BE): header + records, in bytes  │
//! ├───────────────────────────────────────────────────┤
//! │ INDEX REGION                                      │
//! │ word | ':' | offset (u64 BE) | ':' | len (u16 BE) │
//! │ | '\n'          ... repeated, in source order ... │
//! ├───────────────────────────────────────────────────┤
//! │ DATA REGION (the source file, verbatim)           │
//! │ word | ',' | definition | '\n'                    │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Every `offset` is absolute within the store file and points at the first
//! byte of the record's `word,` prefix.

mod builder;
mod format;
mod reader;
mod remote;

pub use builder::{BuildSummary, StoreBuilder};
pub use format::{open_data_region, read_region_size, tmp_path};
pub use reader::StoreReader;
pub use remote::{
    BlobStore, DirBlobStore, FileRangeReader, MemoryBlobStore, RangeRead, RemoteRangeReader,
};

use std::io;

use index::IndexError;
use thiserror::Error;
use wordfile::WordFileError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Source(#[from] WordFileError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("fetch {key} bytes {start}-{end}: {detail}")]
    Fetch {
        key: String,
        start: u64,
        end: u64,
        detail: String,
    },
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}
