//! Store header helpers and path conventions.

use byteorder::{BigEndian, ReadBytesExt};
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Result as IoResult, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use wordfile::WordFileReader;

use crate::StoreError;

/// Sibling path a file is written to before being renamed over `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Reads the 8-byte header giving the index region size.
pub fn read_region_size<R: Read>(r: &mut R) -> IoResult<u64> {
    r.read_u64::<BigEndian>()
}

/// Opens a store file positioned at its data region.
///
/// Returns the index region size along with a reader over the `word,definition`
/// lines, so the data can be streamed without loading the index.
pub fn open_data_region(path: &Path) -> Result<(u64, WordFileReader<File>), StoreError> {
    let mut f = File::open(path)
        .map_err(|e| StoreError::io(format!("open store {}", path.display()), e))?;
    let index_size = read_region_size(&mut f)
        .map_err(|e| StoreError::io(format!("read header of {}", path.display()), e))?;
    if index_size < index::HEADER_BYTES {
        return Err(StoreError::Corrupt(format!(
            "index size {} is smaller than the header",
            index_size
        )));
    }
    f.seek(SeekFrom::Start(index_size))
        .map_err(|e| StoreError::io(format!("seek to data region of {}", path.display()), e))?;
    Ok((index_size, WordFileReader::from_reader(f)))
}
