//! Record decoding
//!
//! The scratch buffer after a successful read holds one record followed
//! by zero fill and possibly the start of the next record. Only the
//! bytes up to the first line terminator belong to the caller.

use crate::error::Result;

/// Extract the first record from a scratch buffer as text.
///
/// Trailing zero fill is stripped before splitting, so a buffer the
/// producer never touched decodes to an empty record rather than an
/// error.
pub fn decode(scratch: &[u8]) -> Result<&str> {
    let trimmed = match scratch.iter().rposition(|&b| b != 0) {
        Some(last) => &scratch[..=last],
        None => &[],
    };
    let line = trimmed.split(|&b| b == b'\n').next().unwrap_or(&[]);
    Ok(std::str::from_utf8(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_buffer_is_empty_record() {
        let scratch = [0u8; 256];
        assert_eq!(decode(&scratch).unwrap(), "");
    }

    #[test]
    fn test_stops_at_first_terminator() {
        let mut scratch = [0u8; 32];
        scratch[..11].copy_from_slice(b"first\nsecon");
        assert_eq!(decode(&scratch).unwrap(), "first");
    }

    #[test]
    fn test_unterminated_tail_is_kept() {
        let mut scratch = [0u8; 16];
        scratch[..3].copy_from_slice(b"abc");
        assert_eq!(decode(&scratch).unwrap(), "abc");
    }

    #[test]
    fn test_full_buffer_without_fill() {
        let scratch = *b"xy\n";
        assert_eq!(decode(&scratch).unwrap(), "xy");
    }

    #[test]
    fn test_non_text_record_is_an_error() {
        let mut scratch = [0u8; 8];
        scratch[..3].copy_from_slice(&[0xff, 0xfe, b'\n']);
        assert!(decode(&scratch).is_err());
    }
}
