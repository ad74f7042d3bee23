//! Validate — recompute a line's checksum and compare it to the embedded one.

use super::checksum::log_line_checksum;
use super::model::{LineError, ParsedLine};

/// Validate one raw line, byte for byte.
///
/// Pure and allocation-light; safe to call from any number of workers.
/// Blank input is not special-cased: it has too few fields and fails with
/// [`LineError::Format`].
pub fn validate_line(line: impl AsRef<[u8]>) -> Result<(), LineError> {
    let parsed = ParsedLine::parse(line.as_ref())?;
    let expected = log_line_checksum(parsed.message);
    if parsed.checksum != expected.as_bytes() {
        return Err(LineError::ChecksumMismatch {
            expected,
            actual: String::from_utf8_lossy(parsed.checksum).into_owned(),
        });
    }
    Ok(())
}
