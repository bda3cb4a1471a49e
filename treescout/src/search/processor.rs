use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

use super::matcher::NeedleMatcher;

// Constants for file processing
const BUFFER_CAPACITY: usize = 65536;

/// What searching one file produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOutcome {
    /// Needle occurrences in the file
    pub occurrences: u64,
    /// Lines longer than the scan buffer, scanned in several chunks
    pub oversized_lines: u64,
}

/// Reads files line by line and counts needle occurrences
#[derive(Debug, Clone)]
pub struct FileProcessor {
    matcher: NeedleMatcher,
    max_line_length: usize,
}

impl FileProcessor {
    /// Creates a new FileProcessor with the given matcher and line buffer size
    pub fn new(matcher: NeedleMatcher, max_line_length: usize) -> Self {
        Self {
            matcher,
            max_line_length: max_line_length.max(1),
        }
    }

    /// Processes a file and returns its occurrence count.
    ///
    /// Fails only when the file cannot be opened or a read fails part-way; the caller
    /// records either case as one unreadable path.
    pub fn process_file(&self, path: &Path) -> io::Result<FileOutcome> {
        trace!("Processing file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        self.process_reader(&mut reader, path)
    }

    /// Counts occurrences in every line produced by `reader`
    pub fn process_reader<R: BufRead>(
        &self,
        reader: &mut R,
        path: &Path,
    ) -> io::Result<FileOutcome> {
        let mut outcome = FileOutcome::default();
        let mut chunk = Vec::with_capacity(256.min(self.max_line_length));
        let mut in_long_line = false;

        while let Some(continues) = read_line_chunk(reader, &mut chunk, self.max_line_length)? {
            if continues && !in_long_line {
                debug!(
                    "Line longer than {} bytes in {}, scanning it in chunks",
                    self.max_line_length,
                    path.display()
                );
                outcome.oversized_lines += 1;
            }
            in_long_line = continues;
            outcome.occurrences += self.matcher.count_in_line(&chunk);
        }

        trace!(
            "Found {} occurrences in file {}",
            outcome.occurrences,
            path.display()
        );
        Ok(outcome)
    }
}

/// Reads the next chunk of a line into `buf`, at most `limit` bytes.
///
/// The line terminator is consumed but not stored. A line longer than `limit` comes back over
/// several calls; the returned flag is true while the current line continues past `buf`.
/// Returns `None` at end of input.
pub(crate) fn read_line_chunk<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> io::Result<Option<bool>> {
    buf.clear();
    let mut read_any = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(read_any.then_some(false));
        }

        if buf.len() >= limit {
            // Full chunk: the line only ends here if its terminator comes next
            let ends = available[0] == b'\n';
            if ends {
                reader.consume(1);
            }
            return Ok(Some(!ends));
        }
        read_any = true;

        let room = limit - buf.len();
        let (consumed, done) = match memchr::memchr(b'\n', available) {
            Some(end) if end <= room => {
                buf.extend_from_slice(&available[..end]);
                (end + 1, true)
            }
            _ => {
                let take = available.len().min(room);
                buf.extend_from_slice(&available[..take]);
                (take, false)
            }
        };
        reader.consume(consumed);
        if done {
            return Ok(Some(false));
        }
    }
}
