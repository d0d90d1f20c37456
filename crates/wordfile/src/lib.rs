//! # Wordfile
//!
//! Plain-text `word,definition` files: the dictionary source, the data region
//! of a store, and update changelogs all share this format. Lines are sorted
//! ascending by word and the word ends at the first `,`; everything after it
//! (commas included) is the definition.
//!
//! [`merge`] applies a sorted changelog to a sorted word stream.

mod merge;

pub use merge::{merge, MergeStats};

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordFileError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed line {line}: {detail}")]
    Format { line: u64, detail: String },
    #[error("changelog contract violated: {0}")]
    Contract(String),
}

/// One `word,definition` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordLine {
    pub word: String,
    pub definition: String,
}

impl WordLine {
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            definition: definition.into(),
        }
    }

    /// Splits `line` (without its newline) on the first comma.
    pub fn parse(line: &str, line_no: u64) -> Result<Self, WordFileError> {
        match line.split_once(',') {
            Some((word, definition)) => Ok(Self::new(word, definition)),
            None => Err(WordFileError::Format {
                line: line_no,
                detail: format!("missing ',' in {:?}", line),
            }),
        }
    }
}

/// A parsed line and where it started, relative to the start of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub line: WordLine,
    pub offset: u64,
}

/// Streaming reader over a word file. Every line is parsed strictly.
pub struct WordFileReader<R: Read> {
    rdr: BufReader<R>,
    buf: Vec<u8>,
    line_no: u64,
    offset: u64,
    ascending: bool,
    last_word: Option<String>,
}

impl WordFileReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<WordFileReader<File>, WordFileError> {
        let f = File::open(path)?;
        Ok(Self::from_reader(f))
    }
}

impl<R: Read> WordFileReader<R> {
    pub fn from_reader(reader: R) -> Self {
        WordFileReader {
            rdr: BufReader::new(reader),
            buf: Vec::new(),
            line_no: 0,
            offset: 0,
            ascending: false,
            last_word: None,
        }
    }

    /// Fail with a format error when a word is not strictly greater than the
    /// one before it.
    pub fn require_ascending(mut self) -> Self {
        self.ascending = true;
        self
    }

    /// Byte offset of the next unread line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next line, or `None` at end of stream.
    pub fn next_entry(&mut self) -> Result<Option<Entry>, WordFileError> {
        self.buf.clear();
        let n = self.rdr.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let start = self.offset;
        self.offset += n as u64;

        let raw = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
        let text = std::str::from_utf8(raw).map_err(|_| WordFileError::Format {
            line: self.line_no,
            detail: "line is not valid utf-8".to_string(),
        })?;
        let line = WordLine::parse(text, self.line_no)?;

        if self.ascending {
            if let Some(prev) = &self.last_word {
                if line.word.as_str() <= prev.as_str() {
                    return Err(WordFileError::Format {
                        line: self.line_no,
                        detail: format!("word {:?} does not sort after {:?}", line.word, prev),
                    });
                }
            }
            self.last_word = Some(line.word.clone());
        }

        Ok(Some(Entry {
            line,
            offset: start,
        }))
    }
}

impl<R: Read> Iterator for WordFileReader<R> {
    type Item = Result<Entry, WordFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Buffered writer that emits one `word,definition\n` line per call.
pub struct WordFileWriter<W: Write> {
    w: BufWriter<W>,
    lines: u64,
}

impl WordFileWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, WordFileError> {
        let f = File::create(path)?;
        Ok(Self::from_writer(f))
    }

    /// Flushes buffered lines and fsyncs the file.
    pub fn sync(self) -> Result<u64, WordFileError> {
        let lines = self.lines;
        let f = self.w.into_inner().map_err(|e| e.into_error())?;
        f.sync_all()?;
        Ok(lines)
    }
}

impl<W: Write> WordFileWriter<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            w: BufWriter::new(writer),
            lines: 0,
        }
    }

    pub fn append(&mut self, line: &WordLine) -> Result<(), WordFileError> {
        self.w.write_all(line.word.as_bytes())?;
        self.w.write_all(b",")?;
        self.w.write_all(line.definition.as_bytes())?;
        self.w.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(self) -> Result<W, WordFileError> {
        self.w.into_inner().map_err(|e| WordFileError::Io(e.into_error()))
    }
}
