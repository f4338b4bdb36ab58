//! Uniform entry point of every format

use chip_binary::Format;

use crate::aym::{protracker2, soundtrackerpro};
use crate::{Container, DecodeError};

/// Format detection and decoding facade
///
/// Implementations hold only immutable compiled state, so one instance can
/// serve concurrent decodes of different inputs.
pub trait Decoder: Send + Sync {
    /// Human-readable format name
    fn description(&self) -> &'static str;

    /// Byte-pattern pre-filter of the format
    fn format(&self) -> &Format;

    /// Pattern match plus structural checks, without a full parse
    fn check(&self, data: &[u8]) -> bool;

    /// Full structural parse without materializing any data
    ///
    /// Returns the module container on success. Any failure means "not this
    /// format".
    fn decode(&self, data: &chip_binary::Container) -> Option<Container>;
}

/// Decoders for all supported formats
pub fn all_decoders() -> Result<Vec<Box<dyn Decoder>>, DecodeError> {
    Ok(vec![
        Box::new(protracker2::Decoder::new()?),
        Box::new(soundtrackerpro::Decoder::new()?),
    ])
}
