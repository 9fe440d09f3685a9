use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::SourceError;
use crate::types::Record;

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Streams trimmed records out of a newline-delimited file, optionally gunzipping it on the fly.
///
/// Yields at most one error, after which the iterator is exhausted. The file handle is closed
/// when the source is dropped.
pub struct LineSource {
    path: PathBuf,
    compressed: bool,
    reader: Box<dyn BufRead + Send>,
    line: Vec<u8>,
    done: bool,
}

impl LineSource {
    pub fn open(path: impl AsRef<Path>, is_compressed: bool) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;

        // Concatenated gzip members are read back to back, like `zcat`
        let reader: Box<dyn BufRead + Send> = if is_compressed {
            Box::new(BufReader::with_capacity(
                READ_BUFFER_BYTES,
                MultiGzDecoder::new(BufReader::new(file)),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER_BYTES, file))
        };

        Ok(Self {
            path,
            compressed: is_compressed,
            reader,
            line: Vec::new(),
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn classify(&self, source: io::Error) -> SourceError {
        let path = self.path.clone();
        if self.compressed && is_malformed_stream(source.kind()) {
            SourceError::Decompression { path, source }
        } else {
            SourceError::Io { path, source }
        }
    }
}

// The kinds flate2 reports for bad headers, corrupt deflate data, checksum
// mismatches and truncated members.
fn is_malformed_stream(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
    )
}

impl Iterator for LineSource {
    type Item = Result<Record, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.line.clear();
        match self.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => Some(Ok(Record::from_line(&self.line))),
            Err(err) => {
                // Whatever was buffered for this line is dropped with it
                self.done = true;
                self.line.clear();
                Some(Err(self.classify(err)))
            }
        }
    }
}

impl FusedIterator for LineSource {}
