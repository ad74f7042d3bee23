//! Checksum — the fingerprint producers embed in every log line.
//!
//! CRC-32 (IEEE) of the message bytes, written as an unsigned LEB128 varint
//! into a zero-filled 5-byte buffer, with the whole buffer encoded as
//! unpadded URL-safe base64. The output is always 7 characters long.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Maximum varint length of a u32.
const MAX_VARINT_LEN_32: usize = 5;

/// Compute the checksum producers attach to `message`. Works on raw
/// bytes; the message does not have to be valid UTF-8.
pub fn log_line_checksum(message: impl AsRef<[u8]>) -> String {
    let crc = crc32fast::hash(message.as_ref());
    let mut buf = [0u8; MAX_VARINT_LEN_32];
    put_uvarint(&mut buf, crc);
    URL_SAFE_NO_PAD.encode(buf)
}

fn put_uvarint(buf: &mut [u8; MAX_VARINT_LEN_32], mut value: u32) {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(log_line_checksum("hello world"), "haOoagA");
        assert_eq!(log_line_checksum(""), "AAAAAAA");
        assert_eq!(log_line_checksum("Certificate issued serial=abc"), "qYH9qgI");
    }

    #[test]
    fn test_hashes_raw_bytes() {
        // Latin-1 "café": not UTF-8, must not be replaced before hashing
        assert_eq!(log_line_checksum(b"caf\xe9"), "m-DO3Qo");
        assert_eq!(log_line_checksum("caf\u{fffd}"), "roG7jA8");
    }

    #[test]
    fn test_always_seven_chars() {
        for msg in ["a", "a much longer message with spaces", "ümlaut", "\t"] {
            assert_eq!(log_line_checksum(msg).len(), 7, "message {:?}", msg);
        }
    }

    #[test]
    fn test_uvarint_layout() {
        let mut buf = [0u8; MAX_VARINT_LEN_32];
        put_uvarint(&mut buf, 300);
        assert_eq!(buf, [0xac, 0x02, 0, 0, 0]);

        let mut buf = [0u8; MAX_VARINT_LEN_32];
        put_uvarint(&mut buf, u32::MAX);
        assert_eq!(buf, [0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn test_case_sensitive_alphabet() {
        // URL-safe alphabet, so '+' and '/' never appear
        let sum = log_line_checksum("some message that exercises the alphabet ~~~ ???");
        assert!(!sum.contains('+') && !sum.contains('/') && !sum.contains('='));
    }
}
