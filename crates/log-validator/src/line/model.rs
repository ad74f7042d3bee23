use std::fmt;
use thiserror::Error;

use super::FIXED_FIELDS;

/// Why a line failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// Fewer than six space-delimited fields
    #[error("line doesn't match expected format")]
    Format,
    /// Embedded checksum differs from the one recomputed over the message
    #[error("invalid checksum (expected {expected:?}, got {actual:?})")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Outcome label used for the `status` metric dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineStatus {
    Ok,
    Bad,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Ok => "ok",
            LineStatus::Bad => "bad",
        }
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log line split into its fixed fields. Borrows from the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub timestamp: &'a [u8],
    pub hostname: &'a [u8],
    pub datacenter: &'a [u8],
    pub severity: &'a [u8],
    pub tag: &'a [u8],
    pub checksum: &'a [u8],
    /// Everything after the sixth separator, verbatim.
    pub message: &'a [u8],
}

impl<'a> ParsedLine<'a> {
    /// Split on single spaces. Consecutive spaces produce empty fields, so
    /// the message is exactly the remaining fields rejoined with one space.
    pub fn parse(line: &'a [u8]) -> Result<Self, LineError> {
        let mut parts = line.splitn(FIXED_FIELDS + 1, |b| *b == b' ');
        let mut fixed: [&[u8]; FIXED_FIELDS] = Default::default();
        for slot in fixed.iter_mut() {
            *slot = parts.next().ok_or(LineError::Format)?;
        }
        let [timestamp, hostname, datacenter, severity, tag, checksum] = fixed;

        Ok(Self {
            timestamp,
            hostname,
            datacenter,
            severity,
            tag,
            checksum,
            message: parts.next().unwrap_or_default(),
        })
    }
}
