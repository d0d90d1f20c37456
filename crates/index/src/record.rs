use byteorder::{BigEndian, ByteOrder};
use tracing::warn;

use crate::IndexError;

/// Size of the region header in bytes (`region_size` as u64).
pub const HEADER_BYTES: u64 = 8;

/// Fixed bytes per record beyond the word itself:
/// `':'` + offset(8) + `':'` + def_len(2) + `'\n'`.
pub const RECORD_OVERHEAD: u64 = 1 + 8 + 1 + 2 + 1;

/// Largest definition a record can describe.
pub const MAX_DEFINITION_LEN: usize = u16::MAX as usize;

const FIELD_SEP: u8 = b':';
const RECORD_END: u8 = b'\n';

/// Location of one word inside a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub word: String,
    /// Absolute byte offset of the `word,` prefix in the final store file.
    pub offset: u64,
    pub def_len: u16,
}

/// How to react to a record that does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Fail on the first corrupt record.
    Strict,
    /// Log and skip corrupt records.
    #[default]
    Tolerant,
}

impl Record {
    pub fn new(word: impl Into<String>, offset: u64, def_len: u16) -> Self {
        Self {
            word: word.into(),
            offset,
            def_len,
        }
    }

    /// Number of bytes this record occupies once encoded.
    pub fn encoded_len(&self) -> u64 {
        self.word.len() as u64 + RECORD_OVERHEAD
    }

    /// Absolute offset of the first definition byte (just past `word,`).
    pub fn definition_start(&self) -> Result<u64, IndexError> {
        (self.word.len() as u64)
            .checked_add(1)
            .and_then(|prefix| self.offset.checked_add(prefix))
            .ok_or_else(|| self.overflow())
    }

    /// Inclusive byte range holding the definition, or `None` when it is empty.
    ///
    /// Fails when the range does not fit in a `u64`, which only a corrupt
    /// offset can cause.
    pub fn definition_range(&self) -> Result<Option<(u64, u64)>, IndexError> {
        if self.def_len == 0 {
            return Ok(None);
        }
        let start = self.definition_start()?;
        let end = start
            .checked_add(u64::from(self.def_len) - 1)
            .ok_or_else(|| self.overflow())?;
        Ok(Some((start, end)))
    }

    /// Appends the encoded record to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut offset = [0u8; 8];
        let mut def_len = [0u8; 2];
        BigEndian::write_u64(&mut offset, self.offset);
        BigEndian::write_u16(&mut def_len, self.def_len);

        buf.extend_from_slice(self.word.as_bytes());
        buf.push(FIELD_SEP);
        buf.extend_from_slice(&offset);
        buf.push(FIELD_SEP);
        buf.extend_from_slice(&def_len);
        buf.push(RECORD_END);
    }

    fn overflow(&self) -> IndexError {
        IndexError::OffsetOverflow {
            word: self.word.clone(),
            offset: self.offset,
        }
    }
}

/// Rejects words that would corrupt either the index or the data region.
pub fn validate_word(word: &str) -> Result<(), IndexError> {
    let reason = if word.is_empty() {
        "empty word"
    } else if word.contains(':') {
        "contains ':'"
    } else if word.contains(',') {
        "contains ','"
    } else if word.contains('\n') {
        "contains a newline"
    } else {
        return Ok(());
    };
    Err(IndexError::InvalidWord {
        word: word.to_string(),
        reason,
    })
}

/// Total size of the index region for `records`, header included.
pub fn region_size<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .fold(HEADER_BYTES, |acc, r| acc + r.encoded_len())
}

pub fn encode_header(region_size: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, region_size);
    buf
}

pub fn decode_header(buf: &[u8]) -> Result<u64, IndexError> {
    if buf.len() < HEADER_BYTES as usize {
        return Err(IndexError::Truncated(buf.len()));
    }
    Ok(BigEndian::read_u64(&buf[..HEADER_BYTES as usize]))
}

/// Serializes the header followed by `records` in the given order.
///
/// Offsets are written as-is; callers shift them to their final position first.
pub fn encode_region(records: &[Record]) -> Vec<u8> {
    let size = region_size(records);
    let mut buf = Vec::with_capacity(size as usize);
    buf.extend_from_slice(&encode_header(size));
    for r in records {
        r.encode_into(&mut buf);
    }
    buf
}

/// Decodes the records that follow the region header.
///
/// The word ends at the first `':'`; the remaining fields are fixed width, so
/// binary offsets that happen to contain `':'` or `'\n'` bytes still decode.
pub fn decode_records(body: &[u8], mode: ParseMode) -> Result<Vec<Record>, IndexError> {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while pos < body.len() {
        match decode_one(body, pos) {
            Ok((record, next)) => {
                records.push(record);
                pos = next;
            }
            Err(err) => {
                if mode == ParseMode::Strict {
                    return Err(err);
                }
                warn!(error = %err, "skipping corrupt index record");
                match body[pos..].iter().position(|&b| b == RECORD_END) {
                    Some(nl) => pos += nl + 1,
                    None => break,
                }
            }
        }
    }

    Ok(records)
}

fn decode_one(body: &[u8], pos: usize) -> Result<(Record, usize), IndexError> {
    let corrupt = |detail: &str| IndexError::Corrupt {
        pos,
        detail: detail.to_string(),
    };

    let rest = &body[pos..];
    let word_len = rest
        .iter()
        .position(|&b| b == FIELD_SEP || b == RECORD_END)
        .ok_or_else(|| corrupt("missing field separator"))?;
    if rest[word_len] == RECORD_END {
        return Err(corrupt("record has a single field"));
    }
    if word_len == 0 {
        return Err(corrupt("empty word"));
    }

    let fields = &rest[word_len..];
    if fields.len() < RECORD_OVERHEAD as usize {
        return Err(corrupt("record truncated"));
    }
    if fields[9] != FIELD_SEP || fields[12] != RECORD_END {
        return Err(corrupt("wrong field count"));
    }

    let word = std::str::from_utf8(&rest[..word_len])
        .map_err(|_| corrupt("word is not utf-8"))?
        .to_string();
    let offset = BigEndian::read_u64(&fields[1..9]);
    let def_len = BigEndian::read_u16(&fields[10..12]);

    let next = pos + word_len + RECORD_OVERHEAD as usize;
    Ok((Record::new(word, offset, def_len), next))
}
