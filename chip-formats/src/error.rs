//! Decoding error types

use chip_binary::BinaryError;

/// Reasons a module parse was abandoned
///
/// None of these escape the [`crate::Decoder`] facade: they are logged and
/// turned into "not this format".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Binary(#[from] BinaryError),

    /// Range overlaps an already claimed one or lies outside the data
    #[error("range of {size} bytes at offset {offset} overlaps or exceeds the data")]
    InvalidRange { offset: usize, size: usize },

    #[error("index {index} is outside {min}..={max}")]
    IndexOutOfDomain { index: usize, min: usize, max: usize },

    #[error("positions list is empty")]
    EmptyPositions,

    /// Pattern, line or channel started out of ascending order
    #[error("{what} {index} started after {previous}")]
    OutOfOrder {
        what: &'static str,
        index: usize,
        previous: usize,
    },

    #[error("no valid patterns")]
    NoValidPatterns,

    #[error("no valid samples")]
    NoValidSamples,

    #[error("module size {size} is less than {min}")]
    TooSmall { size: usize, min: usize },

    /// Format-specific structural requirement failed
    #[error("invalid structure: {0}")]
    Invalid(&'static str),
}

/// Turn a failed structural requirement into an error
pub(crate) fn require(condition: bool, reason: &'static str) -> Result<(), DecodeError> {
    if condition {
        Ok(())
    } else {
        Err(DecodeError::Invalid(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DecodeError::IndexOutOfDomain {
                index: 40,
                min: 0,
                max: 31
            }
            .to_string(),
            "index 40 is outside 0..=31"
        );
        assert_eq!(
            DecodeError::from(BinaryError::OutOfBounds {
                offset: 4,
                size: 2,
                limit: 5
            })
            .to_string(),
            "2 bytes at offset 4 exceed data size 5"
        );
    }

    #[test]
    fn test_require() {
        assert_eq!(require(true, "fine"), Ok(()));
        assert_eq!(require(false, "tempo"), Err(DecodeError::Invalid("tempo")));
    }
}
