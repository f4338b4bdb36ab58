//! Cursor engine tests with a two-channel toy format
//!
//! Toy opcodes: `00..=7f` note and end of event, `80..=bf` set period,
//! `c0` rest. Channel 0 reading `ff` ends the pattern.

use super::*;
use chip_binary::view::read_u8_at;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Line(usize),
    Channel(usize),
    Note(u8),
    Rest,
    Finish(usize),
}

#[derive(Default)]
struct Recorder(Vec<Event>);

impl PatternBuilder for Recorder {
    fn finish(&mut self, size: usize) {
        self.0.push(Event::Finish(size));
    }
    fn start_line(&mut self, index: usize) {
        self.0.push(Event::Line(index));
    }
    fn start_channel(&mut self, index: usize) {
        self.0.push(Event::Channel(index));
    }
    fn set_tempo(&mut self, _tempo: u32) {}
}

struct ToyFormat<'a> {
    data: &'a [u8],
}

impl LineDecoder<Recorder> for ToyFormat<'_> {
    fn has_line(&self, channels: &[ChannelState]) -> Result<bool, DecodeError> {
        for (index, state) in channels.iter().enumerate() {
            if state.counter > 0 {
                continue;
            }
            if state.offset >= self.data.len()
                || (index == 0 && read_u8_at(self.data, state.offset)? == 0xff)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn parse_channel(
        &self,
        state: &mut ChannelState,
        builder: &mut Recorder,
    ) -> Result<(), DecodeError> {
        while state.offset < self.data.len() {
            let cmd = read_u8_at(self.data, state.offset)?;
            state.offset += 1;
            match cmd {
                0x00..=0x7f => {
                    builder.0.push(Event::Note(cmd));
                    break;
                }
                0x80..=0xbf => state.period = usize::from(cmd - 0x80),
                0xc0 => {
                    builder.0.push(Event::Rest);
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

const LIMITS: PatternLimits = PatternLimits {
    min_size: 1,
    max_size: 64,
};

/// Tempo, pattern entry at H = 1, shared end marker at H + 6
fn minimal_module() -> Vec<u8> {
    let mut data = vec![6u8];
    data.extend_from_slice(&[7, 0, 7, 0, 0, 0]);
    data.push(0xff);
    data
}

#[test]
fn test_empty_two_channel_pattern() {
    let data = minimal_module();
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    let valid = parse_pattern(&format, [7, 7], LIMITS, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert!(!valid);
    assert_eq!(builder.0, vec![Event::Finish(1)]);
    assert_eq!(ranges.fixed_area(), (7, 8));
    assert_eq!(ranges.size(), 8);
}

#[test]
fn test_periods_skip_silent_lines() {
    // channel 0 at 0, channel 1 at 4
    let data = [0x82, 0x01, 0x02, 0xff, 0x82, 0x10, 0x11, 0x12];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    let valid = parse_pattern(&format, [0, 4], LIMITS, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert!(valid);
    assert_eq!(
        builder.0,
        vec![
            Event::Line(0),
            Event::Channel(0),
            Event::Note(0x01),
            Event::Channel(1),
            Event::Note(0x10),
            Event::Line(3),
            Event::Channel(0),
            Event::Note(0x02),
            Event::Channel(1),
            Event::Note(0x11),
            Event::Finish(6),
        ]
    );
    assert_eq!(ranges.fixed_area(), (0, 8));
}

#[test]
fn test_sustained_channel_is_not_restarted() {
    // channel 1 waits one line between events
    let data = [0x00, 0x01, 0x02, 0xff, 0x81, 0x20, 0xc0];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    parse_pattern(&format, [0, 4], LIMITS, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert_eq!(
        builder.0,
        vec![
            Event::Line(0),
            Event::Channel(0),
            Event::Note(0x00),
            Event::Channel(1),
            Event::Note(0x20),
            Event::Line(1),
            Event::Channel(0),
            Event::Note(0x01),
            Event::Line(2),
            Event::Channel(0),
            Event::Note(0x02),
            Event::Channel(1),
            Event::Rest,
            Event::Finish(3),
        ]
    );
}

#[test]
fn test_line_ceiling() {
    let data = [0x01; 200];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };
    let limits = PatternLimits {
        min_size: 5,
        max_size: 16,
    };

    let valid = parse_pattern(&format, [0, 100], limits, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert!(valid);
    let lines = builder
        .0
        .iter()
        .filter(|e| matches!(e, Event::Line(_)))
        .count();
    assert_eq!(lines, 16);
    assert_eq!(builder.0.last(), Some(&Event::Finish(16)));
}

#[test]
fn test_skip_past_ceiling_stops() {
    // both channels wait 63 lines after their first event
    let data = [0xbf, 0x01, 0x01, 0xbf, 0x02, 0x02];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    let valid = parse_pattern(&format, [0, 3], LIMITS, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert!(valid);
    assert_eq!(
        builder.0.iter().filter(|e| matches!(e, Event::Line(_))).count(),
        1
    );
    assert_eq!(builder.0.last(), Some(&Event::Finish(64)));
}

#[test]
fn test_short_pattern_is_invalid() {
    let data = [0x01, 0x02, 0xff, 0x05, 0x06, 0x07];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };
    let limits = PatternLimits {
        min_size: 5,
        max_size: 64,
    };

    let valid = parse_pattern(&format, [0, 3], limits, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert!(!valid);
    assert_eq!(builder.0.last(), Some(&Event::Finish(5)));
}

#[test]
fn test_start_outside_data_is_not_claimed() {
    let data = [0xff, 0x01];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    parse_pattern(&format, [0, 10], LIMITS, data.len(), &mut builder, &mut ranges)
        .expect("parsed");

    assert_eq!(ranges.fixed_area(), (0, 1));
}

#[test]
fn test_overlapping_channel_data_fails() {
    // channel 1 starts inside channel 0's consumed bytes
    let data = [0x81, 0x01, 0x02, 0xff];
    let mut ranges = RangesMap::new(data.len());
    let mut builder = Recorder::default();
    let format = ToyFormat { data: &data };

    let result = parse_pattern(&format, [0, 1], LIMITS, data.len(), &mut builder, &mut ranges);

    assert!(matches!(result, Err(DecodeError::InvalidRange { .. })));
}
