//! Log stream records
//!
//! The producer prints one record per commit, each terminated by a NUL byte.
//! Within a record the fields are newline separated:
//!
//! ```text
//! <hash>
//! <parent hash> <parent hash> ...
//! <author name>
//! <author email>
//! <author date, RFC 3339>
//! <committer name>
//! <committer email>
//! <committer date, RFC 3339>
//! <message, possibly several lines>\0
//! ```
//!
//! A newline may separate a NUL from the next record.

use crate::artifacts::objects::commit::{Commit, Signature};
use crate::artifacts::objects::object_id::ObjectId;
use crate::error::{EngineError, Result};
use chrono::{DateTime, FixedOffset};
use std::io::BufRead;

/// Number of header lines preceding the message
pub const RECORD_HEADER_LINES: usize = 8;

const RECORD_TERMINATOR: u8 = 0;

/// `git log` pretty format producing the record layout above
pub const LOG_FORMAT: &str = "%H%n%P%n%an%n%ae%n%aI%n%cn%n%ce%n%cI%n%B";

/// Incremental decoder over a producer's stdout
pub struct LogRecordReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> LogRecordReader<R> {
    pub fn new(reader: R) -> Self {
        LogRecordReader {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Decode the next commit
    ///
    /// # Returns
    ///
    /// `Ok(None)` once the underlying reader is exhausted
    pub fn next_record(&mut self) -> Result<Option<Commit>> {
        self.buffer.clear();
        let read = self.reader.read_until(RECORD_TERMINATOR, &mut self.buffer)?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = self.buffer.last() == Some(&RECORD_TERMINATOR);
        let record = trim_record(&self.buffer);

        if record.is_empty() {
            // trailing newline after the final NUL
            if !terminated {
                return Ok(None);
            }
            return Err(EngineError::ParseFailure("empty log record".to_string()));
        }

        parse_record(record).map(Some)
    }
}

fn trim_record(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(&[RECORD_TERMINATOR]).unwrap_or(raw);
    let start = raw
        .iter()
        .position(|byte| *byte != b'\n')
        .unwrap_or(raw.len());
    &raw[start..]
}

/// Parse one NUL-stripped record
pub fn parse_record(record: &[u8]) -> Result<Commit> {
    let record = String::from_utf8_lossy(record);
    let lines = record.split('\n').collect::<Vec<_>>();

    if lines.len() < RECORD_HEADER_LINES {
        return Err(EngineError::ShortRecord(lines.len()));
    }

    let oid = ObjectId::try_parse(lines[0])?;
    let parents = lines[1]
        .split_whitespace()
        .map(ObjectId::try_parse)
        .collect::<Result<Vec<_>>>()?;

    let author = Signature::new(
        lines[2].to_string(),
        lines[3].to_string(),
        parse_instant(lines[4]),
    );
    let committer = Signature::new(
        lines[5].to_string(),
        lines[6].to_string(),
        parse_instant(lines[7]),
    );

    let message = lines[RECORD_HEADER_LINES..].join("\n");
    let message = message.trim_end_matches('\n').to_string();

    Ok(Commit::new(oid, parents, author, committer, message))
}

/// Malformed instants degrade to the zero instant
fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}
