use crate::error::{Result, WarcBatchError};
use std::io::BufRead;
use std::path::Path;
use url::Url;

/// One line of driver input: a path or URI naming a WARC file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    value: String,
    line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    Local,
    Remote { scheme: String },
}

impl InputRecord {
    /// Returns `None` for lines that are empty once surrounding whitespace is trimmed.
    pub fn parse(line: &str, line_number: usize) -> Option<Self> {
        let value = line.trim();
        if value.is_empty() {
            return None;
        }

        Some(Self {
            value: value.to_string(),
            line_number,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// 1-based line of the input stream this record came from.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Everything after the last `/`, or the whole record when it has none.
    pub fn basename(&self) -> &str {
        match self.value.rfind('/') {
            Some(index) => &self.value[index + 1..],
            None => &self.value,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match Url::parse(&self.value) {
            // Single-letter schemes are Windows drive letters, not URIs.
            Ok(url) if url.scheme().len() > 1 => RecordKind::Remote {
                scheme: url.scheme().to_string(),
            },
            _ => RecordKind::Local,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self.kind() {
            RecordKind::Local => Some(Path::new(&self.value)),
            RecordKind::Remote { .. } => None,
        }
    }
}

impl std::fmt::Display for InputRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Pulls records from a line-oriented reader one at a time, skipping blank lines.
///
/// Nothing is read ahead: the reader is only advanced when the next record is
/// requested, so input left behind after the driver stops stays unread.
pub struct RecordSource<R> {
    reader: R,
    buffer: String,
    lines_read: usize,
}

impl<R: BufRead> RecordSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            lines_read: 0,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<InputRecord>> {
        loop {
            self.buffer.clear();
            let bytes = self
                .reader
                .read_line(&mut self.buffer)
                .map_err(|source| WarcBatchError::InputRead {
                    line: self.lines_read + 1,
                    source,
                })?;

            if bytes == 0 {
                return Ok(None);
            }

            self.lines_read += 1;

            if let Some(record) = InputRecord::parse(&self.buffer, self.lines_read) {
                return Ok(Some(record));
            }
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
