//! Multi-channel pattern cursor engine
//!
//! Tracker formats store each pattern channel as its own command stream.
//! A channel emits an event, then stays silent for `period` lines before
//! reading its next command. The engine advances all channel cursors line
//! by line and leaves opcode decoding to a format-specific [`LineDecoder`].
//!
//! # Per-line algorithm
//!
//! 1. Skip `min(counter)` lines at once: nothing happens on them
//! 2. Ask the decoder whether the pattern continues
//! 3. Start the line and decode every channel whose counter is zero,
//!    reloading its counter from its period
//!
//! After the loop every channel's consumed bytes are claimed as a fixed
//! range, which makes them part of the module fingerprint.

#[cfg(test)]
mod tests;

use chip_binary::view::{read_le_u16_at, read_u8_at};

use crate::{DecodeError, PatternBuilder, RangesMap};

/// Cursor of one channel's command stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelState {
    /// Offset of the next command byte
    pub offset: usize,
    /// Lines to stay silent after each event
    pub period: usize,
    /// Lines left until the next event
    pub counter: usize,
}

impl ChannelState {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Read the byte under the cursor and advance
    pub fn read_u8(&mut self, data: &[u8]) -> Result<u8, DecodeError> {
        let value = read_u8_at(data, self.offset)?;
        self.offset += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self, data: &[u8]) -> Result<i8, DecodeError> {
        self.read_u8(data).map(|b| b as i8)
    }

    /// Read a little-endian word under the cursor and advance
    pub fn read_le_u16(&mut self, data: &[u8]) -> Result<u16, DecodeError> {
        let value = read_le_u16_at(data, self.offset)?;
        self.offset += 2;
        Ok(value)
    }
}

/// Format-specific part of pattern decoding
pub trait LineDecoder<B: ?Sized> {
    /// Whether another line follows, given the cursors of all channels
    fn has_line(&self, channels: &[ChannelState]) -> Result<bool, DecodeError>;

    /// Decode commands of one channel up to and including its event
    fn parse_channel(&self, state: &mut ChannelState, builder: &mut B) -> Result<(), DecodeError>;
}

/// Line count bounds of a format's patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternLimits {
    pub min_size: usize,
    pub max_size: usize,
}

/// Decode one pattern whose channels start at `starts`
///
/// Reports lines to `builder`, claims channel data in `ranges` and returns
/// whether the pattern reached the minimal line count.
pub fn parse_pattern<B, D, const N: usize>(
    decoder: &D,
    starts: [usize; N],
    limits: PatternLimits,
    data_size: usize,
    builder: &mut B,
    ranges: &mut RangesMap,
) -> Result<bool, DecodeError>
where
    B: PatternBuilder + ?Sized,
    D: LineDecoder<B> + ?Sized,
{
    let mut channels = starts.map(ChannelState::new);
    let mut line = 0;
    let mut finished = false;
    while line < limits.max_size {
        let skip = channels.iter().map(|c| c.counter).min().unwrap_or(0);
        if skip > 0 {
            channels.iter_mut().for_each(|c| c.counter -= skip);
            line += skip;
            if line >= limits.max_size {
                break;
            }
        }
        if !decoder.has_line(&channels)? {
            builder.finish(line.max(limits.min_size));
            finished = true;
            break;
        }
        builder.start_line(line);
        for (index, channel) in channels.iter_mut().enumerate() {
            if channel.counter > 0 {
                channel.counter -= 1;
                continue;
            }
            builder.start_channel(index);
            decoder.parse_channel(channel, builder)?;
            channel.counter = channel.period;
        }
        line += 1;
    }
    if !finished {
        builder.finish(limits.max_size);
    }

    for (&start, channel) in starts.iter().zip(&channels) {
        if start >= data_size {
            tracing::warn!(offset = start, "Invalid channel offset");
            continue;
        }
        let stop = data_size.min(channel.offset + 1);
        ranges.add_fixed(start, stop - start)?;
    }
    Ok(line >= limits.min_size)
}
