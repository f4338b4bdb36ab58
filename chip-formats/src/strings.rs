//! Text helpers for fixed-size name fields

/// Clean a fixed-size ASCII field
///
/// Stops at the first NUL, replaces control and non-ASCII bytes with spaces
/// and trims both ends.
pub fn optimize_ascii(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text: String = bytes[..len]
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() {
                char::from(b)
            } else {
                ' '
            }
        })
        .collect();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimize_ascii() {
        assert_eq!(optimize_ascii(b"  Song name     "), "Song name");
        assert_eq!(optimize_ascii(b"Tab\tand\x80high"), "Tab and high");
        assert_eq!(optimize_ascii(b"Cut\0here"), "Cut");
        assert_eq!(optimize_ascii(b"\x01\x02   "), "");
        assert_eq!(optimize_ascii(b""), "");
    }
}
