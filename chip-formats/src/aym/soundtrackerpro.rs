//! Sound Tracker Pro compiled modules
//!
//! Typical layout, in file order:
//!
//! ```text
//! Header      tempo, table offsets, fixes count
//! Id          optional "KSA SOFTWARE COMPILATION OF " + title
//! Pattern data
//! Ornaments
//! Samples
//! Positions
//! Patterns    three LE channel offsets per pattern
//! Ornaments offsets
//! Samples offsets (may be truncated)
//! ```
//!
//! Data offsets inside tables are player addresses. A module compiled for
//! a non-zero address is detected by the first channel of pattern 0, which
//! always follows the header.

use chip_binary::view::{read_bytes_at, read_i8_at, read_le_i16_at, read_le_u16_at, read_u8_at};
use chip_binary::{Format, PatchedDataBuilder};

use crate::builder::builder_methods;
use crate::error::require;
use crate::pattern::{self, ChannelState, LineDecoder, PatternLimits};
use crate::strings::optimize_ascii;
use crate::{
    AreaController, Container, DecodeError, Indices, LinesObject, MetaBuilder, PatternBuilder,
    RangesMap, StatisticCollectingBuilder, StubMetaBuilder, UsageLimits,
};

pub const DESCRIPTION: &str = "Sound Tracker Pro Compiled";
const PROGRAM: &str = "Sound Tracker Pro";

const MIN_SIZE: usize = 200;
const MAX_SIZE: usize = 0x2800;

pub const MIN_PATTERN_SIZE: usize = 5;
pub const MAX_PATTERN_SIZE: usize = 64;
pub const MAX_PATTERNS_COUNT: usize = 32;
pub const MAX_SAMPLES_COUNT: usize = 15;
pub const MAX_ORNAMENTS_COUNT: usize = 16;

pub const DEFAULT_SAMPLE: usize = 0;
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
    "03-0f",  // tempo
    "?00-26", // positions offset
    "?00-27", // patterns offset
    "?00-27", // ornaments offset
    "?00-27", // samples offset
);

const TEMPO: usize = 0;
const POSITIONS_OFFSET: usize = 1;
const PATTERNS_OFFSET: usize = 3;
const ORNAMENTS_OFFSET: usize = 5;
const SAMPLES_OFFSET: usize = 7;
const FIXES_COUNT: usize = 9;
const HEADER_SIZE: usize = 10;

const ID: &[u8; 28] = b"KSA SOFTWARE COMPILATION OF ";
const TITLE_SIZE: usize = 25;
pub const IDENTIFIER_SIZE: usize = ID.len() + TITLE_SIZE;

const PATTERN_SIZE: usize = 6;
const POSITION_ENTRY_SIZE: usize = 2;
const POSITIONS_HEADER_SIZE: usize = 2;
const OBJECT_HEADER_SIZE: usize = 2;
const SAMPLE_LINE_SIZE: usize = 4;
const ORNAMENTS_TABLE_SIZE: usize = MAX_ORNAMENTS_COUNT * 2;
const SAMPLES_TABLE_SIZE: usize = MAX_SAMPLES_COUNT * 2;

/// Highest address a relocated module may reach
const ADDRESS_SPACE: usize = 0x10000;

// =============================================================================
// Module model
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleLine {
    pub level: u32,
    pub noise: u32,
    pub tone_mask: bool,
    pub noise_mask: bool,
    pub envelope_mask: bool,
    pub vibrato: i32,
}

pub type Sample = LinesObject<SampleLine>;
pub type Ornament = LinesObject<i8>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionEntry {
    pub pattern_index: usize,
    pub transposition: i32,
}

pub type Positions = LinesObject<PositionEntry>;

/// Receiver of decoded Sound Tracker Pro structure
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
    fn set_envelope(&mut self, kind: u32, value: u32);
    fn set_no_envelope(&mut self);
    fn set_glissade(&mut self, step: i32);
    fn set_volume(&mut self, volume: u32);
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

macro_rules! plain_callbacks {
    ($mode:ident) => {
        builder_methods! { $mode;
            fn set_initial_tempo(&mut self, tempo: u32);
            fn set_rest(&mut self);
            fn set_note(&mut self, note: u32);
            fn set_envelope(&mut self, kind: u32, value: u32);
            fn set_no_envelope(&mut self);
            fn set_glissade(&mut self, step: i32);
            fn set_volume(&mut self, volume: u32);
        }
    };
}

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
        self.record_positions(positions.lines.iter().map(|entry| entry.pattern_index));
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

#[derive(Debug, Clone, Copy)]
struct Header {
    tempo: u8,
    positions_offset: usize,
    patterns_offset: usize,
    ornaments_offset: usize,
    samples_offset: usize,
    fixes_count: u8,
}

impl Header {
    fn read(data: &[u8]) -> Result<Self, DecodeError> {
        let word = |offset| read_le_u16_at(data, offset).map(usize::from);
        Ok(Self {
            tempo: read_u8_at(data, TEMPO)?,
            positions_offset: word(POSITIONS_OFFSET)?,
            patterns_offset: word(PATTERNS_OFFSET)?,
            ornaments_offset: word(ORNAMENTS_OFFSET)?,
            samples_offset: word(SAMPLES_OFFSET)?,
            fixes_count: read_u8_at(data, FIXES_COUNT)?,
        })
    }

    fn is_valid(&self) -> bool {
        (3..=15).contains(&self.tempo)
            && (HEADER_SIZE..=0x2600).contains(&self.positions_offset)
            && [
                self.patterns_offset,
                self.ornaments_offset,
                self.samples_offset,
            ]
            .iter()
            .all(|offset| (HEADER_SIZE..=0x2700).contains(offset))
    }

    /// Data end implied by the samples table
    fn max_size(&self) -> usize {
        self.samples_offset + SAMPLES_TABLE_SIZE
    }
}

fn has_identifier(data: &[u8]) -> bool {
    read_bytes_at(data, HEADER_SIZE, IDENTIFIER_SIZE).is_ok_and(|id| id.starts_with(ID))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
    Header,
    Identifier,
    Positions,
    Patterns,
    Ornaments,
    Samples,
    End,
}

fn make_view(data: &[u8]) -> &[u8] {
    &data[..data.len().min(MAX_SIZE)]
}

fn check(data: &[u8]) -> bool {
    let Ok(header) = Header::read(data) else {
        return false;
    };
    if !header.is_valid() {
        return false;
    }
    let size = data.len().min(header.max_size());
    let mut areas = AreaController::new();
    areas.add_area(Area::Header, 0);
    if has_identifier(&data[..size]) {
        areas.add_area(Area::Identifier, HEADER_SIZE);
    }
    areas.add_area(Area::Positions, header.positions_offset);
    areas.add_area(Area::Patterns, header.patterns_offset);
    areas.add_area(Area::Ornaments, header.ornaments_offset);
    areas.add_area(Area::Samples, header.samples_offset);
    areas.add_area(Area::End, size);

    let header_fits = areas
        .area_size(Area::Header)
        .is_some_and(|s| s >= HEADER_SIZE)
        && areas.area_size(Area::End).is_none();
    let samples_last = areas.is_last(Area::Samples);
    let ornaments_fit = areas.area_size(Area::Ornaments) == Some(ORNAMENTS_TABLE_SIZE);
    header_fits && samples_last && ornaments_fit && check_positions(data, &areas)
}

fn check_positions(data: &[u8], areas: &AreaController<Area>) -> bool {
    let (Some(address), Some(size)) = (
        areas.area_address(Area::Positions),
        areas.area_size(Area::Positions),
    ) else {
        return false;
    };
    let Ok(length) = read_u8_at(data, address) else {
        return false;
    };
    if length == 0 {
        return false;
    }
    let required = POSITIONS_HEADER_SIZE + usize::from(length) * POSITION_ENTRY_SIZE;
    // a wrong length in the header leaves an odd gap before the next table
    required <= size && (size - required) % POSITION_ENTRY_SIZE == 0
}

// =============================================================================
// Parsing
// =============================================================================

/// `size` and `loop` bytes of a sample or ornament
fn object_size_and_loop(data: &[u8], offset: usize) -> Result<(usize, usize), DecodeError> {
    let loop_index = read_i8_at(data, offset)?;
    let size = usize::try_from(read_i8_at(data, offset + 1)?).unwrap_or(0);
    let loop_index = usize::try_from(loop_index).unwrap_or(size);
    Ok((size, loop_index.min(size)))
}

fn parse_sample_line(data: &[u8], offset: usize) -> Result<SampleLine, DecodeError> {
    let level_and_flags = read_u8_at(data, offset)?;
    let noise_and_flag = read_u8_at(data, offset + 1)?;
    Ok(SampleLine {
        level: u32::from(level_and_flags & 15),
        noise: u32::from((noise_and_flag & 62) >> 1),
        tone_mask: level_and_flags & 16 != 0,
        noise_mask: level_and_flags & 128 != 0,
        envelope_mask: noise_and_flag & 1 != 0,
        vibrato: i32::from(read_le_i16_at(data, offset + 2)?),
    })
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
                0x01..=0x60 => {
                    builder.set_note(u32::from(cmd - 1));
                    break;
                }
                0x61..=0x6f => builder.use_sample(usize::from(cmd - 0x61)),
                0x70..=0x7f => {
                    builder.use_ornament(usize::from(cmd - 0x70));
                    builder.set_no_envelope();
                    builder.set_glissade(0);
                }
                0x80..=0xbf => state.period = usize::from(cmd - 0x80),
                0xc0..=0xcf => {
                    if cmd == 0xc0 {
                        builder.set_envelope(0, 0);
                    } else {
                        let value = state.read_u8(data)?;
                        builder.set_envelope(u32::from(cmd - 0xc0), u32::from(value));
                    }
                    builder.use_ornament(0);
                    builder.set_glissade(0);
                }
                0xd0..=0xdf => {
                    builder.set_rest();
                    break;
                }
                0xe0..=0xef => break,
                0xf0 => {
                    let step = state.read_i8(data)?;
                    builder.set_glissade(i32::from(step));
                }
                0xf1..=0xff => builder.set_volume(u32::from(cmd - 0xf1)),
            }
        }
        Ok(())
    }
}

struct ModuleParser<'a> {
    data: &'a [u8],
    ranges: RangesMap,
    header: Header,
    has_identifier: bool,
    /// Player address of the first data byte
    unfix_delta: usize,
}

impl<'a> ModuleParser<'a> {
    fn new(data: &'a [u8]) -> Result<Self, DecodeError> {
        let header = Header::read(data)?;
        let mut ranges = RangesMap::new(data.len());
        ranges.add_service(0, HEADER_SIZE)?;
        read_bytes_at(data, HEADER_SIZE, IDENTIFIER_SIZE)?;
        let has_identifier = has_identifier(data);

        ranges.add_service(header.patterns_offset, PATTERN_SIZE)?;
        let first_data = usize::from(read_le_u16_at(data, header.patterns_offset)?);
        let header_size = HEADER_SIZE + if has_identifier { IDENTIFIER_SIZE } else { 0 };
        if header.fixes_count != 0 {
            require(first_data == header_size, "fixed module data offset")?;
        } else {
            require(first_data >= header_size, "module data offset")?;
        }
        let unfix_delta = first_data - header_size;
        if unfix_delta != 0 {
            tracing::debug!(unfix_delta, "Relocated module");
        }
        if has_identifier {
            ranges.add_service(HEADER_SIZE, IDENTIFIER_SIZE)?;
        }
        Ok(Self {
            data,
            ranges,
            header,
            has_identifier,
            unfix_delta,
        })
    }

    fn header_size(&self) -> usize {
        HEADER_SIZE
            + if self.has_identifier {
                IDENTIFIER_SIZE
            } else {
                0
            }
    }

    fn parse_common_properties<B: Builder + ?Sized>(
        &self,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        builder.set_initial_tempo(u32::from(self.header.tempo));
        let meta = builder.meta_builder();
        meta.set_program(PROGRAM);
        if self.has_identifier {
            let title = read_bytes_at(self.data, HEADER_SIZE + ID.len(), TITLE_SIZE)?;
            meta.set_title(&optimize_ascii(title));
        }
        Ok(())
    }

    fn parse_positions<B: Builder + ?Sized>(&mut self, builder: &mut B) -> Result<(), DecodeError> {
        let offset = self.header.positions_offset;
        let length = usize::from(read_u8_at(self.data, offset)?);
        require(length != 0, "positions count")?;
        self.ranges.add_service(
            offset,
            POSITIONS_HEADER_SIZE + length * POSITION_ENTRY_SIZE,
        )?;
        let entries = read_bytes_at(
            self.data,
            offset + POSITIONS_HEADER_SIZE,
            length * POSITION_ENTRY_SIZE,
        )?;
        let lines = entries
            .chunks_exact(POSITION_ENTRY_SIZE)
            .map(|entry| {
                let pattern_offset = usize::from(entry[0]);
                require(pattern_offset % PATTERN_SIZE == 0, "position entry")?;
                Ok(PositionEntry {
                    pattern_index: pattern_offset / PATTERN_SIZE,
                    transposition: i32::from(entry[1] as i8),
                })
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;
        let loop_index = usize::from(read_u8_at(self.data, offset + 1)?);
        let positions = Positions::new(lines, loop_index);
        tracing::debug!(
            count = positions.size(),
            loop_index = positions.loop_index,
            "Positions"
        );
        builder.set_positions(positions);
        Ok(())
    }

    fn parse_patterns<B: Builder + ?Sized>(
        &mut self,
        patterns: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = patterns.len(), "Patterns to parse");
        let min_offset = self.header_size();
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
        let offset = self.header.patterns_offset + index * PATTERN_SIZE;
        self.ranges.add_service(offset, PATTERN_SIZE)?;
        let mut starts = [0usize; 3];
        for (channel, start) in starts.iter_mut().enumerate() {
            let address = usize::from(read_le_u16_at(self.data, offset + channel * 2)?);
            require(address >= min_offset + self.unfix_delta, "channel offset")?;
            *start = address - self.unfix_delta;
        }

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

    /// File offset of an object addressed by a table entry
    fn object_offset(&self, entry: usize) -> Result<usize, DecodeError> {
        let address = read_le_u16_at(self.data, entry)?;
        // relocation wraps around the 16-bit address space
        Ok(usize::from(address.wrapping_sub(self.unfix_delta as u16)))
    }

    fn parse_samples<B: Builder + ?Sized>(
        &mut self,
        samples: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = samples.len(), "Samples to parse");
        let table = self.header.samples_offset;
        for index in samples.iter() {
            tracing::debug!(index, "Parse sample");
            let offset = self.object_offset(table + index * 2)?;
            let (size, loop_index) = object_size_and_loop(self.data, offset)?;
            let used_size = OBJECT_HEADER_SIZE + (size * SAMPLE_LINE_SIZE).min(256);
            self.ranges.add(offset, used_size)?;
            let base = offset + OBJECT_HEADER_SIZE;
            let lines = (0..size)
                .map(|idx| parse_sample_line(self.data, base + (idx % 64) * SAMPLE_LINE_SIZE))
                .collect::<Result<Vec<_>, _>>()?;
            builder.set_sample(index, Sample::new(lines, loop_index));
        }
        let table_size = SAMPLES_TABLE_SIZE.min(self.data.len().saturating_sub(table));
        self.ranges.add(table, table_size)
    }

    fn parse_ornaments<B: Builder + ?Sized>(
        &mut self,
        ornaments: &Indices,
        builder: &mut B,
    ) -> Result<(), DecodeError> {
        tracing::debug!(count = ornaments.len(), "Ornaments to parse");
        for index in ornaments.iter() {
            tracing::debug!(index, "Parse ornament");
            let entry = self.header.ornaments_offset + index * 2;
            self.ranges.add_service(entry, 2)?;
            let offset = self.object_offset(entry)?;
            let (size, loop_index) = object_size_and_loop(self.data, offset)?;
            self.ranges.add(offset, OBJECT_HEADER_SIZE + size.min(256))?;
            let base = offset + OBJECT_HEADER_SIZE;
            let lines = (0..size)
                .map(|idx| read_i8_at(self.data, base + usize::from(idx as u8)))
                .collect::<Result<Vec<_>, _>>()?;
            builder.set_ornament(index, Ornament::new(lines, loop_index));
        }
        Ok(())
    }

    fn size(&self) -> Result<usize, DecodeError> {
        let size = self.ranges.size();
        require(size + self.unfix_delta <= ADDRESS_SPACE, "relocated size")?;
        Ok(size)
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
    let header = Header::read(view)?;
    let view = &view[..view.len().min(header.max_size())];
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

    let size = format.size()?;
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
    if !check(make_view(data.data())) {
        return None;
    }
    parse_module(data, target)
        .inspect_err(|error| tracing::debug!(%error, "Failed to create"))
        .ok()
}

// =============================================================================
// Metadata patching
// =============================================================================

/// Identifier block carrying `title`, padded with spaces
pub fn make_identifier(title: &str) -> [u8; IDENTIFIER_SIZE] {
    let mut result = [b' '; IDENTIFIER_SIZE];
    result[..ID.len()].copy_from_slice(ID);
    let title = title.as_bytes();
    let len = title.len().min(TITLE_SIZE);
    result[ID.len()..ID.len() + len].copy_from_slice(&title[..len]);
    result
}

/// Store `info` as the module identifier block
///
/// An existing identifier is overwritten in place. Otherwise the block is
/// inserted after the header and every table entry pointing past it is
/// shifted by [`IDENTIFIER_SIZE`]. Returns `None` if `data` is not a valid
/// module.
pub fn insert_meta_information(
    data: &chip_binary::Container,
    info: &[u8; IDENTIFIER_SIZE],
) -> Option<chip_binary::Container> {
    let mut statistic = StatisticCollectingBuilder::new(STUB_BUILDER, USAGE);
    let parsed = parse(data, &mut statistic)?;
    patch_module(&parsed, &statistic, info)
        .inspect_err(|error| tracing::debug!(%error, "Failed to insert metainformation"))
        .ok()
}

fn patch_module(
    parsed: &Container,
    statistic: &StatisticCollectingBuilder<StubBuilder>,
    info: &[u8; IDENTIFIER_SIZE],
) -> Result<chip_binary::Container, DecodeError> {
    let data = parsed.data();
    let header = Header::read(data)?;
    let mut patch = PatchedDataBuilder::new(parsed.binary());
    if has_identifier(data) {
        patch.overwrite_data(HEADER_SIZE, info)?;
        return Ok(patch.result());
    }

    patch.insert_data(HEADER_SIZE, info)?;
    let delta = IDENTIFIER_SIZE as i32;
    for field in [
        POSITIONS_OFFSET,
        PATTERNS_OFFSET,
        ORNAMENTS_OFFSET,
        SAMPLES_OFFSET,
    ] {
        patch.fix_le_word(field, delta)?;
    }
    let mut patterns = statistic.used_patterns()?.clone();
    // pattern 0 locates the first data byte
    patterns.insert(0)?;
    for index in patterns.iter() {
        let offsets = header.patterns_offset + index * PATTERN_SIZE;
        for channel in 0..3 {
            patch.fix_le_word(offsets + channel * 2, delta)?;
        }
    }
    for index in statistic.used_ornaments()?.iter() {
        patch.fix_le_word(header.ornaments_offset + index * 2, delta)?;
    }
    for index in statistic.used_samples()?.iter() {
        patch.fix_le_word(header.samples_offset + index * 2, delta)?;
    }
    Ok(patch.result())
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
        self.format.matches(view) && check(view)
    }

    fn decode(&self, data: &chip_binary::Container) -> Option<Container> {
        let mut builder = STUB_BUILDER;
        parse(data, &mut builder)
    }
}
