//! Programmatic module generation for integration tests.
//!
//! Each generator lays out a minimal but structurally complete module in
//! the order real trackers write them, so decoders see realistic offsets.

#![allow(dead_code)]

use chip_formats::aym::soundtrackerpro::make_identifier;

fn put_word(data: &mut [u8], offset: usize, value: usize) {
    let value = u16::try_from(value).expect("word fits");
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

// =============================================================================
// ProTracker 2
// =============================================================================

/// ProTracker 2 module description
///
/// Sample 1 and ornament 0 are the only objects stored; every other table
/// entry is zero. The sample is written last so tests can truncate it.
pub struct Pt2Module {
    pub tempo: u8,
    pub title: String,
    pub positions: Vec<u8>,
    pub loop_position: u8,
    pub patterns: Vec<[Vec<u8>; 3]>,
    pub ornament: Vec<u8>,
    pub sample: Vec<u8>,
}

/// Six note lines on channel 0, one sustained rest on channels 1 and 2
pub fn pt2_pattern(first_note: u8) -> [Vec<u8>; 3] {
    let mut lead = vec![0xe1];
    lead.extend((0..6).map(|i| 0x80 + first_note + i));
    lead.push(0x00);
    [lead, vec![0x25, 0xe0, 0x00], vec![0x25, 0xe0, 0x00]]
}

/// Sample with `lines` lines, each `(flags, level, vibrato)`
pub fn pt2_sample(lines: u8, loop_line: u8) -> Vec<u8> {
    let mut sample = vec![lines, loop_line];
    for idx in 0..lines {
        sample.extend_from_slice(&[0b0000_0110 | (idx << 3), 0xf0, idx]);
    }
    sample
}

impl Pt2Module {
    pub fn simple() -> Self {
        Self {
            tempo: 3,
            title: "Test tune".to_string(),
            positions: vec![0],
            loop_position: 0,
            patterns: vec![pt2_pattern(12)],
            ornament: vec![2, 0, 0, 12],
            sample: pt2_sample(2, 0),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let header_size = 131 + self.positions.len() + 1;
        let patterns_offset = header_size;
        let mut data = vec![0u8; header_size];
        data[0] = self.tempo;
        data[1] = u8::try_from(self.positions.len()).expect("positions count");
        data[2] = self.loop_position;
        put_word(&mut data, 99, patterns_offset);
        let mut name = self.title.as_bytes().to_vec();
        name.resize(30, b' ');
        data[101..131].copy_from_slice(&name[..30]);
        data[131..131 + self.positions.len()].copy_from_slice(&self.positions);
        data[131 + self.positions.len()] = 0xff;

        data.resize(patterns_offset + self.patterns.len() * 6, 0);
        for (index, channels) in self.patterns.iter().enumerate() {
            for (channel, bytes) in channels.iter().enumerate() {
                let offset = data.len();
                put_word(&mut data, patterns_offset + index * 6 + channel * 2, offset);
                data.extend_from_slice(bytes);
            }
        }
        let ornament_offset = data.len();
        put_word(&mut data, 67, ornament_offset);
        data.extend_from_slice(&self.ornament);
        let sample_offset = data.len();
        put_word(&mut data, 3 + 2, sample_offset);
        data.extend_from_slice(&self.sample);
        data
    }

    /// Offset of the first pattern data byte
    pub fn pattern_data_offset(&self) -> usize {
        131 + self.positions.len() + 1 + self.patterns.len() * 6
    }
}

// =============================================================================
// Sound Tracker Pro compiled
// =============================================================================

/// Sound Tracker Pro compiled module description
///
/// Sample 0 and ornament 0 are the only objects stored. Data addresses are
/// file offsets shifted by `delta`, as produced by a relocating compiler.
pub struct StpModule {
    pub tempo: u8,
    pub title: Option<String>,
    pub delta: usize,
    /// `(pattern index, transposition)` pairs
    pub positions: Vec<(u8, i8)>,
    pub loop_position: u8,
    pub patterns: Vec<[Vec<u8>; 3]>,
    pub ornament: Vec<u8>,
    pub sample: Vec<u8>,
}

pub fn stp_pattern(first_note: u8) -> [Vec<u8>; 3] {
    let mut lead = vec![0x61, 0x70];
    lead.extend((0..6).map(|i| 0x01 + first_note + i));
    lead.push(0x00);
    [lead, vec![0x85, 0xd0, 0x00], vec![0x85, 0xd0, 0x00]]
}

/// Sample with `lines` four-byte lines
pub fn stp_sample(lines: u8, loop_line: i8) -> Vec<u8> {
    let mut sample = vec![loop_line as u8, lines];
    for idx in 0..lines {
        sample.extend_from_slice(&[0x10 | (idx & 15), idx << 1, idx, 0]);
    }
    sample
}

impl StpModule {
    pub fn simple() -> Self {
        Self {
            tempo: 6,
            title: None,
            delta: 0,
            positions: vec![(0, 0)],
            loop_position: 0,
            patterns: vec![stp_pattern(12)],
            ornament: vec![0, 2, 1, 0xff],
            sample: stp_sample(32, 0),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; 10];
        data[0] = self.tempo;
        if let Some(title) = &self.title {
            data.extend_from_slice(&make_identifier(title));
        }
        let address = |offset: usize| offset + self.delta;

        let mut channel_offsets = Vec::new();
        for channels in &self.patterns {
            let mut offsets = [0usize; 3];
            for (offset, bytes) in offsets.iter_mut().zip(channels) {
                *offset = data.len();
                data.extend_from_slice(bytes);
            }
            channel_offsets.push(offsets);
        }
        let ornament_offset = data.len();
        data.extend_from_slice(&self.ornament);
        let sample_offset = data.len();
        data.extend_from_slice(&self.sample);

        let positions_offset = data.len();
        data.push(u8::try_from(self.positions.len()).expect("positions count"));
        data.push(self.loop_position);
        for &(pattern, transposition) in &self.positions {
            data.push(pattern * 6);
            data.push(transposition as u8);
        }

        let patterns_offset = data.len();
        data.resize(patterns_offset + self.patterns.len() * 6, 0);
        for (index, offsets) in channel_offsets.iter().enumerate() {
            for (channel, &offset) in offsets.iter().enumerate() {
                put_word(
                    &mut data,
                    patterns_offset + index * 6 + channel * 2,
                    address(offset),
                );
            }
        }

        let ornaments_offset = data.len();
        data.resize(ornaments_offset + 32, 0);
        put_word(&mut data, ornaments_offset, address(ornament_offset));
        let samples_offset = data.len();
        data.resize(samples_offset + 30, 0);
        put_word(&mut data, samples_offset, address(sample_offset));

        put_word(&mut data, 1, positions_offset);
        put_word(&mut data, 3, patterns_offset);
        put_word(&mut data, 5, ornaments_offset);
        put_word(&mut data, 7, samples_offset);
        data
    }
}
