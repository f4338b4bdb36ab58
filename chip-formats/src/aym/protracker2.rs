//! ProTracker 2 modules
//!
//! Typical layout:
//!
//! ```text
//! Header     tempo, length, loop, sample/ornament/pattern offsets, name
//! Positions  pattern indices, 0xff terminated
//! Patterns   three LE channel offsets per pattern
//! Pattern data
//! Samples
//! Ornaments
//! ```
//!
//! Samples and ornaments cut short by the end of data are decoded partially.

use chip_binary::Format;
use chip_binary::view::{bit, read_bytes_at, read_i8_at, read_le_u16_at, read_u8_at};

use crate::builder::builder_methods;
use crate::error::require;
use crate::pattern::{self, ChannelState, LineDecoder, PatternLimits};
use crate::strings::optimize_ascii;
use crate::{
    AreaController, Container, DecodeError, Indices, LinesObject, MetaBuilder, PatternBuilder,
    RangesMap, StatisticCollectingBuilder, StubMetaBuilder, UsageLimits,
};

pub const DESCRIPTION: &str = "Pro Tracker v2.x";
const PROGRAM: &str = DESCRIPTION;

// =============================================================================
// Constants
// =============================================================================

const MIN_SIZE: usize = 100;
const MAX_SIZE: usize = 0x3800;

pub const MAX_POSITIONS_COUNT: usize = 255;
pub const MIN_PATTERN_SIZE: usize = 5;
pub const MAX_PATTERN_SIZE: usize = 64;
pub const MAX_PATTERNS_COUNT: usize = 32;
pub const MAX_SAMPLES_COUNT: usize = 32;
pub const MAX_ORNAMENTS_COUNT: usize = 16;

/// Sample a channel plays before selecting one
pub const DEFAULT_SAMPLE: usize = 1;
/// Ornament a channel plays before selecting one
pub const DEFAULT_ORNAMENT: usize = 0;

const USAGE: UsageLimits = UsageLimits {
    patterns: MAX_PATTERNS_COUNT,
    samples: MAX_SAMPLES_COUNT,
    ornaments: MAX_ORNAMENTS_COUNT,
    default_sample: DEFAULT_SAMPLE,
    default_ornament: DEFAULT_ORNAMENT,
};

const PATTERN_LIMITS: PatternLimits = PatternLimits {
    min_size: MIN_PATTERN_SIZE,
    max_size: MAX_PATTERN_SIZE,
};

const FORMAT: &str = concat!(
    "02-ff",        // tempo
    "01-ff",        // length
    "00-fe",        // loop
    "(?00-36){32}", // samples offsets
    "(?00-36){16}", // ornaments offsets
    "?00-01",       // patterns offset
    "?{30}",        // name
    "00-1f",        // first position
    "ff|00-1f",     // next position or end marker
);

// Header field offsets
const TEMPO: usize = 0;
const LENGTH: usize = 1;
const LOOP: usize = 2;
const SAMPLES_OFFSETS: usize = 3;
const ORNAMENTS_OFFSETS: usize = 67;
const PATTERNS_OFFSET: usize = 99;
const NAME: usize = 101;
const NAME_SIZE: usize = 30;
const POSITIONS: usize = 131;
/// Fixed header part including the first position
const HEADER_SIZE: usize = 132;

const POSITIONS_END_MARKER: u8 = 0xff;
const PATTERN_SIZE: usize = 6;
/// Size and loop bytes before sample/ornament lines
const OBJECT_HEADER_SIZE: usize = 2;
const SAMPLE_LINE_SIZE: usize = 3;

// =============================================================================
// Module model
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleLine {
    pub level: u32,
    pub noise: u32,
    pub tone_mask: bool,
    pub noise_mask: bool,
    pub vibrato: i32,
}

pub type Sample = LinesObject<SampleLine>;
pub type Ornament = LinesObject<i8>;
/// Pattern indices in play order
pub type Positions = LinesObject<usize>;

/// Receiver of decoded ProTracker 2 structure
pub trait Builder: PatternBuilder {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder;
    fn set_initial_tempo(&mut self, tempo: u32);
    fn set_sample(&mut self, index: usize, sample: Sample);
    fn set_ornament(&mut self, index: usize, ornament: Ornament);
    fn set_positions(&mut self, positions: Positions);

    fn start_pattern(&mut self, index: usize);

    fn set_rest(&mut self);
    fn set_note(&mut self, note: u32);
    fn use_sample(&mut self, sample: usize);
    fn use_ornament(&mut self, ornament: usize);
    fn set_volume(&mut self, volume: u32);
    fn set_glissade(&mut self, step: i32);
    fn set_note_glissade(&mut self, step: i32, limit: u32);
    fn set_no_glissade(&mut self);
    fn set_envelope(&mut self, kind: u32, value: u32);
    fn set_no_envelope(&mut self);
    fn set_noise_addon(&mut self, addon: i32);
}

/// Callbacks the usage statistics track
macro_rules! tracked_callbacks {
    ($mode:ident) => {
        builder_methods! { $mode;
            fn set_sample(&mut self, index: usize, sample: Sample);
            fn set_ornament(&mut self, index: usize, ornament: Ornament);
            fn set_positions(&mut self, positions: Positions);
            fn start_pattern(&mut self, index: usize);
            fn use_sample(&mut self, sample: usize);
            fn use_ornament(&mut self, ornament: usize);
        }
    };
}

/// Callbacks every wrapper passes through unchanged
macro_rules! plain_callbacks {
    ($mode:ident) => {
        builder_methods! { $mode;
            fn set_initial_tempo(&mut self, tempo: u32);
            fn set_rest(&mut self);
            fn set_note(&mut self, note: u32);
            fn set_volume(&mut self, volume: u32);
            fn set_glissade(&mut self, step: i32);
            fn set_note_glissade(&mut self, step: i32, limit: u32);
            fn set_no_glissade(&mut self);
            fn set_envelope(&mut self, kind: u32, value: u32);
            fn set_no_envelope(&mut self);
            fn set_noise_addon(&mut self, addon: i32);
        }
    };
}

/// Builder that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct StubBuilder {
    meta: StubMetaBuilder,
}

pub const STUB_BUILDER: StubBuilder = StubBuilder {
    meta: StubMetaBuilder,
};

impl PatternBuilder for StubBuilder {
    fn finish(&mut self, _size: usize) {}
    fn start_line(&mut self, _index: usize) {}
    fn start_channel(&mut self, _index: usize) {}
    fn set_tempo(&mut self, _tempo: u32) {}
}

impl Builder for StubBuilder {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        &mut self.meta
    }
    tracked_callbacks!(stub);
    plain_callbacks!(stub);
}

impl<T: Builder + ?Sized> Builder for &mut T {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        (**self).meta_builder()
    }
    tracked_callbacks!(deref);
    plain_callbacks!(deref);
}

impl<B: Builder> Builder for StatisticCollectingBuilder<B> {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        self.delegate().meta_builder()
    }
    fn set_sample(&mut self, index: usize, sample: Sample) {
        self.check_sample_declaration(index);
        self.delegate().set_sample(index, sample);
    }
    fn set_ornament(&mut self, index: usize, ornament: Ornament) {
        self.check_ornament_declaration(index);
        self.delegate().set_ornament(index, ornament);
    }
    fn set_positions(&mut self, positions: Positions) {
        self.record_positions(positions.lines.iter().copied());
        self.delegate().set_positions(positions);
    }
    fn start_pattern(&mut self, index: usize) {
        self.begin_pattern(index);
        self.delegate().start_pattern(index);
    }
    fn use_sample(&mut self, sample: usize) {
        self.record_sample(sample);
        self.delegate().use_sample(sample);
    }
    fn use_ornament(&mut self, ornament: usize) {
        self.record_ornament(ornament);
        self.delegate().use_ornament(ornament);
    }
    plain_callbacks!(delegate);
}

// =============================================================================
// Structure checks
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    Header,
    Patterns,
    End,
}

fn make_view(data: &[u8]) -> &[u8] {
    &data[..data.len().min(MAX_SIZE)]
}

/// Header size up to and including the positions end marker
fn header_size(data: &[u8]) -> Option<usize> {
    if data.len() < HEADER_SIZE {
        return None;
    }
    let positions = &data[POSITIONS..];
    let end = positions.iter().position(|&b| b == POSITIONS_END_MARKER)?;
    if positions[..end]
        .iter()
        .any(|&p| usize::from(p) >= MAX_PATTERNS_COUNT)
    {
        return None;
    }
    Some(POSITIONS + end + 1)
}

fn fast_check(data: &[u8]) -> bool {
    let Some(header_size) = header_size(data) else {
        return false;
    };
    if !(HEADER_SIZE + 1..=HEADER_SIZE + MAX_POSITIONS_COUNT).contains(&header_size) {
        return false;
    }
    let Ok(patterns_offset) = read_le_u16_at(data, PATTERNS_OFFSET) else {
        return false;
    };
    let mut areas = AreaController::new();
    areas.add_area(Area::Header, 0);
    areas.add_area(Area::Patterns, usize::from(patterns_offset));
    areas.add_area(Area::End, data.len());

    let header_fits = areas
        .area_size(Area::Header)
        .is_some_and(|size| size >= header_size)
        && areas.area_size(Area::End).is_none();
    let patterns_follow = areas.area_size(Area::Patterns).is_some()
        && areas.area_address(Area::Patterns) == Some(header_size);
    header_fits && patterns_follow
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_sample_line(noise_and_flags: u8, level_and_vibrato: u8, vibrato: u8) -> SampleLine {
    let magnitude = (i32::from(level_and_vibrato & 0x0f) << 8) | i32::from(vibrato);
    SampleLine {
        level: u32::from(level_and_vibrato >> 4),
        noise: u32::from(noise_and_flags >> 3),
        tone_mask: bit(noise_and_flags, 1),
        noise_mask: bit(noise_and_flags, 0),
        vibrato: if bit(noise_and_flags, 2) {
            magnitude
        } else {
            -magnitude
        },
    }
}

/// Sample line `index` of lines starting at `base`; offsets wrap at 8 bits
fn read_sample_line(data: &[u8], base: usize, index: usize) -> Result<SampleLine, DecodeError> {
    let offset = (index * SAMPLE_LINE_SIZE) as u8;
    let byte = |delta: u8| read_u8_at(data, base + usize::from(offset.wrapping_add(delta)));
    Ok(parse_sample_line(byte(0)?, byte(1)?, byte(2)?))
}

fn read_ornament_line(data: &[u8], base: usize, index: usize) -> Result<i8, DecodeError> {
    Ok(read_i8_at(data, base + usize::from(index as u8))?)
}

/// Lines of a sample or ornament that fit in the data
enum ObjectExtent {
    Complete(usize),
    Partial(usize),
}

struct ChannelDecoder<'a> {
    data: &'a [u8],
}

impl<B: Builder + ?Sized> LineDecoder<B> for ChannelDecoder<'_> {
    fn has_line(&self, channels: &[ChannelState]) -> Result<bool, DecodeError> {
        for (index, state) in channels.iter().enumerate() {
            if state.counter > 0 {
                continue;
            }
            if state.offset >= self.data.len()
                || (index == 0 && read_u8_at(self.data, state.offset)? == 0x00)
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn parse_channel(&self, state: &mut ChannelState, builder: &mut B) -> Result<(), DecodeError> {
        let data = self.data;
        while state.offset < data.len() {
            let cmd = state.read_u8(data)?;
            match cmd {
                0x00 => {}
                0xe1..=0xff => builder.use_sample(usize::from(cmd - 0xe0)),
                0xe0 => {
                    builder.set_rest();
                    break;
                }
                0x80..=0xdf => {
                    builder.set_note(u32::from(cmd - 0x80));
                    break;
                }
                0x7f => builder.set_no_envelope(),
                0x71..=0x7e => {
                    let tone = state.read_le_u16(data)?;
                    builder.set_envelope(u32::from(cmd - 0x70), u32::from(tone));
                }
                0x70 => break,
                0x60..=0x6f => builder.use_ornament(usize::from(cmd - 0x60)),
                0x20..=0x5f => state.period = usize::from(cmd - 0x20),
                0x10..=0x1f => builder.set_volume(u32::from(cmd - 0x10)),
                0x0f => {
                    // tempo changes are not validated
                    let tempo = state.read_u8(data)?;
                    builder.set_tempo(u32::from(tempo));
                }
                0x0e => {
                    let step = state.read_i8(data)?;
                    builder.set_glissade(i32::from(step));
                }
                0x0d => {
                    let step = state.read_i8(data)?;
                    let limit = state.read_le_u16(data)?;
                    builder.set_note_glissade(i32::from(step), u32::from(limit));
                }
                0x0c => builder.set_no_glissade(),
                0x01..=0x0b => {
                    let addon = state.read_i8(data)?;
                    builder.set_noise_addon(i32::from(addon));
                }
            }
        }
        Ok(())
    }
}

struct ModuleParser<'a> {
    data: &'a [u8],
    ranges: RangesMap,
    header_size: usize,
}

impl<'a> ModuleParser<'a> {
    fn new(data: &'a [u8]) -> Result<Self, DecodeError> {
        let header_size = header_size(data).ok_or(DecodeError::Invalid("positions"))?;
        let mut ranges = RangesMap::new(data.len());
        ranges.add_service(0, header_size)?;
        Ok(Self {
            data,
            ranges,
            header_size,
        })
    }

    fn parse_common_properties<B: Builder + ?Sized>(
        &self,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        let tempo = read_u8_at(self.data, TEMPO)?;
        require(tempo >= 2, "tempo")?;
        builder.set_initial_tempo(u32::from(tempo));
        let title = optimize_ascii(read_bytes_at(self.data, NAME, NAME_SIZE)?);
        let meta = builder.meta_builder();
        meta.set_program(PROGRAM);
        meta.set_title(&title);
        Ok(())
    }

    fn parse_positions<B: Builder + ?Sized>(&self, builder: &mut B) -> Result<(), DecodeError> {
        let count = self.header_size - 1 - POSITIONS;
        require((1..=MAX_POSITIONS_COUNT).contains(&count), "positions count")?;
        let lines = read_bytes_at(self.data, POSITIONS, count)?
            .iter()
            .map(|&p| usize::from(p))
            .collect();
        let positions = Positions::new(lines, usize::from(read_u8_at(self.data, LOOP)?));
        tracing::debug!(
            count,
            loop_index = positions.loop_index,
            header_length = read_u8_at(self.data, LENGTH)?,
            "Positions"
        );
        builder.set_positions(positions);
        Ok(())
    }

    fn patterns_offset(&self) -> Result<usize, DecodeError> {
        Ok(usize::from(read_le_u16_at(self.data, PATTERNS_OFFSET)?))
    }

    fn parse_patterns<B: Builder + ?Sized>(
        &mut self,
        patterns: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = patterns.len(), "Patterns to parse");
        let last = patterns.maximum().unwrap_or(0);
        let min_offset = self.patterns_offset()? + last * PATTERN_SIZE;
        let mut has_valid_patterns = false;
        for index in patterns.iter() {
            tracing::debug!(index, "Parse pattern");
            if self.parse_pattern(index, min_offset, builder)? {
                has_valid_patterns = true;
            }
        }
        if !has_valid_patterns {
            return Err(DecodeError::NoValidPatterns);
        }
        Ok(())
    }

    fn parse_pattern<B: Builder + ?Sized>(
        &mut self,
        index: usize,
        min_offset: usize,
        builder: &mut B,
    ) -> Result<bool, DecodeError> {
        let offset = self.patterns_offset()? + index * PATTERN_SIZE;
        self.ranges.add_service(offset, PATTERN_SIZE)?;
        let mut starts = [0usize; 3];
        for (channel, start) in starts.iter_mut().enumerate() {
            *start = usize::from(read_le_u16_at(self.data, offset + channel * 2)?);
        }
        require(
            starts
                .iter()
                .all(|start| (min_offset..self.data.len()).contains(start)),
            "channel offset",
        )?;

        builder.start_pattern(index);
        let decoder = ChannelDecoder { data: self.data };
        pattern::parse_pattern(
            &decoder,
            starts,
            PATTERN_LIMITS,
            self.data.len(),
            builder,
            &mut self.ranges,
        )
    }

    /// Claim the bytes of an object with `lines` lines of `line_size` bytes
    fn claim_object(
        &mut self,
        offset: usize,
        used_size: usize,
        line_size: usize,
        lines: usize,
    ) -> Result<ObjectExtent, DecodeError> {
        let available = self.data.len() - offset;
        if used_size <= available {
            self.ranges.add(offset, used_size)?;
            Ok(ObjectExtent::Complete(lines))
        } else {
            self.ranges.add(offset, available)?;
            Ok(ObjectExtent::Partial(
                (available - OBJECT_HEADER_SIZE) / line_size,
            ))
        }
    }

    fn parse_samples<B: Builder + ?Sized>(
        &mut self,
        samples: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = samples.len(), "Samples to parse");
        let mut has_valid_samples = false;
        let mut has_partial_samples = false;
        for index in samples.iter() {
            let offset = usize::from(read_le_u16_at(self.data, SAMPLES_OFFSETS + index * 2)?);
            let sample = if offset == 0 {
                tracing::debug!(index, "Parse invalid sample");
                let line = read_sample_line(self.data, 0, 0)?;
                Sample::new(vec![line], 0)
            } else if offset + OBJECT_HEADER_SIZE > self.data.len() {
                tracing::debug!(index, "Stub sample");
                Sample::default()
            } else {
                let size = usize::from(self.data[offset]);
                let loop_index = usize::from(self.data[offset + 1]);
                let used_size = OBJECT_HEADER_SIZE + (size * SAMPLE_LINE_SIZE).min(256);
                let lines = match self.claim_object(offset, used_size, SAMPLE_LINE_SIZE, size)? {
                    ObjectExtent::Complete(lines) => {
                        tracing::debug!(index, "Parse sample");
                        has_valid_samples = true;
                        lines
                    }
                    ObjectExtent::Partial(lines) => {
                        tracing::debug!(index, lines, "Parse partial sample");
                        has_partial_samples = true;
                        lines
                    }
                };
                let base = offset + OBJECT_HEADER_SIZE;
                let lines = (0..lines)
                    .map(|idx| read_sample_line(self.data, base, idx))
                    .collect::<Result<Vec<_>, _>>()?;
                let loop_index = loop_index.min(lines.len());
                Sample::new(lines, loop_index)
            };
            builder.set_sample(index, sample);
        }
        if !(has_valid_samples || has_partial_samples) {
            return Err(DecodeError::NoValidSamples);
        }
        Ok(())
    }

    fn parse_ornaments<B: Builder + ?Sized>(
        &mut self,
        ornaments: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = ornaments.len(), "Ornaments to parse");
        for index in ornaments.iter() {
            let offset = usize::from(read_le_u16_at(self.data, ORNAMENTS_OFFSETS + index * 2)?);
            let ornament = if offset == 0 {
                tracing::debug!(index, "Parse invalid ornament");
                Ornament::new(vec![read_ornament_line(self.data, 0, 0)?], 0)
            } else if offset + OBJECT_HEADER_SIZE > self.data.len() {
                tracing::debug!(index, "Stub ornament");
                Ornament::default()
            } else {
                let size = usize::from(self.data[offset]);
                let loop_index = usize::from(self.data[offset + 1]);
                let lines = match self.claim_object(offset, OBJECT_HEADER_SIZE + size, 1, size)? {
                    ObjectExtent::Complete(lines) => lines,
                    ObjectExtent::Partial(lines) => {
                        tracing::debug!(index, lines, "Parse partial ornament");
                        lines
                    }
                };
                let base = offset + OBJECT_HEADER_SIZE;
                let lines = (0..lines)
                    .map(|idx| read_ornament_line(self.data, base, idx))
                    .collect::<Result<Vec<_>, _>>()?;
                let loop_index = loop_index.min(lines.len());
                Ornament::new(lines, loop_index)
            };
            builder.set_ornament(index, ornament);
        }
        Ok(())
    }

    fn size(&self) -> usize {
        self.ranges.size()
    }

    fn fixed_area(&self) -> (usize, usize) {
        self.ranges.fixed_area()
    }
}

fn parse_module<B: Builder + ?Sized>(
    data: &chip_binary::Container,
    target: &mut B,
) -> Result<Container, DecodeError> {
    let view = make_view(data.data());
    let mut format = ModuleParser::new(view)?;
    format.parse_common_properties(target)?;

    let mut statistic = StatisticCollectingBuilder::new(&mut *target, USAGE);
    format.parse_positions(&mut statistic)?;
    let patterns = statistic.used_patterns()?.clone();
    format.parse_patterns(&patterns, &mut statistic)?;
    let samples = statistic.used_samples()?.clone();
    let ornaments = statistic.used_ornaments()?.clone();

    format.parse_samples(&samples, target)?;
    format.parse_ornaments(&ornaments, target)?;

    let size = format.size();
    if size < MIN_SIZE {
        return Err(DecodeError::TooSmall {
            size,
            min: MIN_SIZE,
        });
    }
    let module = data
        .sub_container(0, size)
        .ok_or(DecodeError::Invalid("module size"))?;
    let (fixed_start, fixed_end) = format.fixed_area();
    Ok(Container::new(module, fixed_start, fixed_end - fixed_start))
}

/// Decode a module into `target`
pub fn parse<B: Builder + ?Sized>(
    data: &chip_binary::Container,
    target: &mut B,
) -> Option<Container> {
    if !fast_check(make_view(data.data())) {
        return None;
    }
    parse_module(data, target)
        .inspect_err(|error| tracing::debug!(%error, "Failed to create"))
        .ok()
}

// =============================================================================
// Decoder
// =============================================================================

pub struct Decoder {
    format: Format,
}

impl Decoder {
    pub fn new() -> Result<Self, DecodeError> {
        Ok(Self {
            format: Format::with_min_size(FORMAT, MIN_SIZE)?,
        })
    }
}

impl crate::Decoder for Decoder {
    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn format(&self) -> &Format {
        &self.format
    }

    fn check(&self, data: &[u8]) -> bool {
        let view = make_view(data);
        self.format.matches(view) && fast_check(view)
    }

    fn decode(&self, data: &chip_binary::Container) -> Option<Container> {
        if !self.format.matches(data.data()) {
            return None;
        }
        let mut builder = STUB_BUILDER;
        parse(data, &mut builder)
    }
}
