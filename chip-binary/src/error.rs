//! Error types for byte access, pattern compilation and patching

/// Errors raised by the binary layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinaryError {
    /// A read or patch touched bytes outside the data
    #[error("{size} bytes at offset {offset} exceed data size {limit}")]
    OutOfBounds {
        offset: usize,
        size: usize,
        limit: usize,
    },

    /// Two insertions requested at the same original offset
    #[error("data is already inserted at offset {0}")]
    DuplicateInsertion(usize),

    /// Format pattern text could not be compiled
    #[error("invalid format pattern at position {position}: {reason}")]
    InvalidPattern {
        position: usize,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BinaryError::OutOfBounds {
                offset: 10,
                size: 2,
                limit: 11
            }
            .to_string(),
            "2 bytes at offset 10 exceed data size 11"
        );
        assert_eq!(
            BinaryError::InvalidPattern {
                position: 3,
                reason: "unclosed group"
            }
            .to_string(),
            "invalid format pattern at position 3: unclosed group"
        );
    }
}
