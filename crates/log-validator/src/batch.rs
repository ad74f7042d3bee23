//! Batch — one-shot validation of a whole file.

use std::io::Write;
use std::path::Path;

use crate::error::{Result, ValidatorError};
use crate::line::validate_line;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Every line, blank ones included.
    pub lines: usize,
    pub checked: usize,
    pub invalid: usize,
}

/// Validate every non-blank line of `path`, writing one diagnostic per
/// invalid line to `report`.
///
/// Does not stop at the first failure. Returns
/// [`ValidatorError::InvalidLines`] if anything was invalid.
pub fn check_file(path: &Path, report: &mut impl Write) -> Result<BatchSummary> {
    let bytes = std::fs::read(path)?;
    let summary = check_bytes(&bytes, report)?;
    if summary.invalid > 0 {
        return Err(ValidatorError::InvalidLines {
            count: summary.invalid,
        });
    }
    Ok(summary)
}

/// Line numbers are 1-based and count blank lines, so they match an editor.
/// Lines are checked as raw bytes; only the diagnostic text is decoded.
pub fn check_bytes(contents: &[u8], report: &mut impl Write) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    for (i, line) in contents.split(|b| *b == b'\n').enumerate() {
        summary.lines += 1;
        if line.is_empty() {
            continue;
        }
        summary.checked += 1;
        if let Err(e) = validate_line(line) {
            summary.invalid += 1;
            writeln!(report, "[line {}] {}: {}", i + 1, e, String::from_utf8_lossy(line))?;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::log_line_checksum;

    fn signed(message: &str) -> String {
        format!("t h d s tag {} {}", log_line_checksum(message), message)
    }

    #[test]
    fn test_blank_first_line_then_bad_checksum() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        std::fs::write(&path, "\nA B C D tag ABC123 hello world\n").unwrap();

        let mut out = Vec::new();
        let err = check_file(&path, &mut out).unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidLines { count: 1 }));

        let report = String::from_utf8(out).unwrap();
        assert_eq!(report.lines().count(), 1);
        assert_eq!(
            report,
            "[line 2] invalid checksum (expected \"haOoagA\", got \"ABC123\"): A B C D tag ABC123 hello world\n"
        );
    }

    #[test]
    fn test_all_valid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("audit.log");
        let text = format!("{}\n\n{}\n", signed("one"), signed("two words"));
        std::fs::write(&path, text).unwrap();

        let mut out = Vec::new();
        let summary = check_file(&path, &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.invalid, 0);
        // "one", "", "two words", and the empty piece after the final newline
        assert_eq!(summary.lines, 4);
    }

    #[test]
    fn test_reports_every_failure() {
        let text = format!(
            "{}\nshort line\n{}\nt h d s tag nope msg\n",
            signed("ok"),
            signed("ok again")
        );
        let mut out = Vec::new();
        let summary = check_bytes(text.as_bytes(), &mut out).unwrap();
        assert_eq!(summary.invalid, 2);

        let report = String::from_utf8(out).unwrap();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[line 2] line doesn't match expected format: short line"));
        assert!(lines[1].starts_with("[line 4] invalid checksum"));
    }

    #[test]
    fn test_empty_file_is_valid() {
        let mut out = Vec::new();
        let summary = check_bytes(b"", &mut out).unwrap();
        assert_eq!(summary.checked, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut out = Vec::new();
        let err = check_file(Path::new("/no/such/file.log"), &mut out).unwrap_err();
        assert!(matches!(err, ValidatorError::Io(_)));
    }

    #[test]
    fn test_non_utf8_line_checked_byte_for_byte() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.log");
        let mut contents = b"t h d s tag ".to_vec();
        contents.extend_from_slice(log_line_checksum(b"caf\xe9").as_bytes());
        contents.extend_from_slice(b" caf\xe9\n");
        std::fs::write(&path, &contents).unwrap();

        let mut out = Vec::new();
        let summary = check_file(&path, &mut out).unwrap();
        assert_eq!(summary.checked, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_non_utf8_bad_line_is_reported_readably() {
        let mut out = Vec::new();
        let summary = check_bytes(b"t h d s tag nope caf\xe9\n", &mut out).unwrap();
        assert_eq!(summary.invalid, 1);
        let report = String::from_utf8(out).unwrap();
        assert!(report.ends_with(": t h d s tag nope caf\u{fffd}\n"));
    }

    #[test]
    fn test_carriage_return_is_part_of_the_message() {
        // only '\n' separates lines, so a CRLF file fails checksum validation
        let text = format!("{}\r\n", signed("crlf"));
        let mut out = Vec::new();
        let summary = check_bytes(text.as_bytes(), &mut out).unwrap();
        assert_eq!(summary.invalid, 1);
    }
}
