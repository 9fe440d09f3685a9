use std::fmt;

/// One input line with surrounding whitespace (and the line terminator) removed.
///
/// Lines are kept as raw bytes; input is not required to be UTF-8. Valid UTF-8 lines
/// are trimmed of Unicode whitespace, anything else of ASCII whitespace and vertical tab.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Record(Vec<u8>);

impl Record {
    /// Build a record from a raw line, trimming it.
    pub fn from_line(line: &[u8]) -> Self {
        match std::str::from_utf8(line) {
            Ok(text) => Record(text.trim().as_bytes().to_vec()),
            Err(_) => Record(trim_bytes(line).to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Record {
    fn from(line: &str) -> Self {
        Record::from_line(line.as_bytes())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({:?})", String::from_utf8_lossy(&self.0))
    }
}

fn is_space_byte(b: &u8) -> bool {
    b.is_ascii_whitespace() || *b == 0x0b
}

fn trim_bytes(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !is_space_byte(b))
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !is_space_byte(b))
        .map_or(start, |i| i + 1);
    &line[start..end]
}

/// Records pushed to the queue in one pipelined round trip.
pub type Batch = Vec<Record>;
