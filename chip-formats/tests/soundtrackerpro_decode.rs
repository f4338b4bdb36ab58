//! Sound Tracker Pro compiled decoding and metainformation patching.

mod module_generator;

use chip_formats::aym::soundtrackerpro::{
    self, Builder, IDENTIFIER_SIZE, Ornament, Positions, Sample, insert_meta_information,
    make_identifier,
};
use chip_formats::{Decoder, MetaBuilder, PatternBuilder};

use module_generator::{StpModule, stp_pattern};

#[derive(Default)]
struct Meta {
    title: Option<String>,
}

impl MetaBuilder for Meta {
    fn set_program(&mut self, _program: &str) {}
    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }
    fn set_author(&mut self, _author: &str) {}
}

/// Records everything that identifies the music itself
#[derive(Default)]
struct Recorder {
    meta: Meta,
    content: Vec<String>,
    positions: Positions,
    samples: Vec<(usize, Sample)>,
    ornaments: Vec<(usize, Ornament)>,
}

impl Recorder {
    fn event(&mut self, event: String) {
        self.content.push(event);
    }
}

impl PatternBuilder for Recorder {
    fn finish(&mut self, size: usize) {
        self.event(format!("finish {size}"));
    }
    fn start_line(&mut self, index: usize) {
        self.event(format!("line {index}"));
    }
    fn start_channel(&mut self, index: usize) {
        self.event(format!("channel {index}"));
    }
    fn set_tempo(&mut self, tempo: u32) {
        self.event(format!("tempo {tempo}"));
    }
}

impl Builder for Recorder {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        &mut self.meta
    }
    fn set_initial_tempo(&mut self, tempo: u32) {
        self.event(format!("initial tempo {tempo}"));
    }
    fn set_sample(&mut self, index: usize, sample: Sample) {
        self.samples.push((index, sample));
    }
    fn set_ornament(&mut self, index: usize, ornament: Ornament) {
        self.ornaments.push((index, ornament));
    }
    fn set_positions(&mut self, positions: Positions) {
        self.positions = positions;
    }
    fn start_pattern(&mut self, index: usize) {
        self.event(format!("pattern {index}"));
    }
    fn set_rest(&mut self) {
        self.event("rest".to_string());
    }
    fn set_note(&mut self, note: u32) {
        self.event(format!("note {note}"));
    }
    fn use_sample(&mut self, sample: usize) {
        self.event(format!("sample {sample}"));
    }
    fn use_ornament(&mut self, ornament: usize) {
        self.event(format!("ornament {ornament}"));
    }
    fn set_envelope(&mut self, kind: u32, value: u32) {
        self.event(format!("envelope {kind} {value}"));
    }
    fn set_no_envelope(&mut self) {
        self.event("no envelope".to_string());
    }
    fn set_glissade(&mut self, step: i32) {
        self.event(format!("glissade {step}"));
    }
    fn set_volume(&mut self, volume: u32) {
        self.event(format!("volume {volume}"));
    }
}

fn decoder() -> soundtrackerpro::Decoder {
    soundtrackerpro::Decoder::new().expect("valid pattern")
}

fn container(data: Vec<u8>) -> chip_binary::Container {
    chip_binary::Container::new(data)
}

fn record(data: &chip_binary::Container) -> (Recorder, chip_formats::Container) {
    let mut recorder = Recorder::default();
    let decoded = soundtrackerpro::parse(data, &mut recorder).expect("parsed");
    (recorder, decoded)
}

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn test_decode_simple_module() {
    let data = StpModule::simple().build();
    let decoder = decoder();

    assert!(decoder.check(&data));
    let decoded = decoder.decode(&container(data.clone())).expect("decoded");
    assert_eq!(decoded.size(), data.len());
    // pattern data directly follows the header
    assert_eq!(decoded.fixed_area(), (10, 15));
}

#[test]
fn test_parse_reports_structure() {
    let (recorder, _) = record(&container(StpModule::simple().build()));

    assert_eq!(recorder.meta.title, None);
    assert_eq!(
        &recorder.content[..8],
        &[
            "initial tempo 6",
            "pattern 0",
            "line 0",
            "channel 0",
            "sample 0",
            "ornament 0",
            "no envelope",
            "glissade 0",
        ]
    );
    assert_eq!(recorder.content.last().map(String::as_str), Some("finish 6"));
    assert_eq!(recorder.positions.lines.len(), 1);

    let (index, sample) = &recorder.samples[0];
    assert_eq!(*index, 0);
    assert_eq!(sample.size(), 32);
    assert_eq!(sample.lines[3].level, 3);
    assert_eq!(sample.lines[3].noise, 3);
    assert!(sample.lines[3].tone_mask);
    assert_eq!(sample.lines[3].vibrato, 3);
    assert_eq!(recorder.ornaments[0].1.lines, vec![1, -1]);
}

#[test]
fn test_title_from_identifier() {
    let mut module = StpModule::simple();
    module.title = Some("Compiled tune".to_string());
    let (recorder, decoded) = record(&container(module.build()));

    assert_eq!(recorder.meta.title.as_deref(), Some("Compiled tune"));
    assert_eq!(decoded.fixed_area().0, 63);
}

#[test]
fn test_relocated_module_has_same_fingerprint() {
    let plain = StpModule::simple();
    let mut relocated = StpModule::simple();
    relocated.delta = 0x8000;

    let (plain_events, plain) = record(&container(plain.build()));
    let (relocated_events, relocated) = record(&container(relocated.build()));

    assert_eq!(plain_events.content, relocated_events.content);
    assert_ne!(plain.checksum(), relocated.checksum());
    assert_eq!(plain.fixed_checksum(), relocated.fixed_checksum());
}

#[test]
fn test_transposition_in_positions() {
    let mut module = StpModule::simple();
    module.patterns = vec![stp_pattern(12), stp_pattern(24)];
    module.positions = vec![(1, -12), (0, 5)];
    let (recorder, _) = record(&container(module.build()));

    let entries: Vec<_> = recorder
        .positions
        .lines
        .iter()
        .map(|entry| (entry.pattern_index, entry.transposition))
        .collect();
    assert_eq!(entries, vec![(1, -12), (0, 5)]);
}

#[test]
fn test_trailing_data_is_not_part_of_module() {
    let module = StpModule::simple().build();
    let mut data = module.clone();
    data.extend_from_slice(&[0x55; 200]);
    let input_size = data.len();

    let decoded = decoder().decode(&container(data)).expect("decoded");
    assert!(decoded.size() <= input_size);
    assert_eq!(decoded.size(), module.len());
    assert_eq!(decoded.data(), module.as_slice());
}

#[test]
fn test_position_beyond_pattern_limit_is_rejected() {
    let mut data = StpModule::simple().build();
    let positions_offset = usize::from(u16::from_le_bytes([data[1], data[2]]));
    // pattern 32, one past the last valid index
    data[positions_offset + 2] = 32 * 6;

    let decoder = decoder();
    assert!(decoder.check(&data));
    let data = container(data);
    assert!(decoder.decode(&data).is_none());
    assert!(soundtrackerpro::parse(&data, &mut Recorder::default()).is_none());
}

#[test]
fn test_misaligned_position_is_rejected() {
    let mut data = StpModule::simple().build();
    let positions_offset = usize::from(u16::from_le_bytes([data[1], data[2]]));
    data[positions_offset + 2] = 5;

    assert!(decoder().decode(&container(data)).is_none());
}

#[test]
fn test_wrong_tempo_is_rejected() {
    let mut module = StpModule::simple();
    module.tempo = 2;

    assert!(!decoder().check(&module.build()));
}

// =============================================================================
// Metainformation
// =============================================================================

#[test]
fn test_insert_identifier() {
    let source = container(StpModule::simple().build());
    let info = make_identifier("Inserted");

    let patched = insert_meta_information(&source, &info).expect("patched");
    assert_eq!(patched.size(), source.size() + info.len());
    assert_eq!(&patched.data()[10..63], info.as_slice());

    let decoder = decoder();
    assert!(decoder.check(patched.data()));
    let redetected = decoder.decode(&patched).expect("redetected");
    assert_eq!(redetected.size(), patched.size());

    let (before, original) = record(&source);
    let (after, tagged) = record(&patched);
    assert_eq!(after.meta.title.as_deref(), Some("Inserted"));
    assert_eq!(before.content, after.content);
    assert_eq!(before.samples, after.samples);
    assert_eq!(before.ornaments, after.ornaments);
    assert_eq!(original.fixed_checksum(), tagged.fixed_checksum());
}

#[test]
fn test_overwrite_identifier() {
    let mut module = StpModule::simple();
    module.title = Some("Old".to_string());
    let source = container(module.build());

    let patched =
        insert_meta_information(&source, &make_identifier("New")).expect("patched");
    assert_eq!(patched.size(), source.size());

    let (recorder, _) = record(&patched);
    assert_eq!(recorder.meta.title.as_deref(), Some("New"));
}

#[test]
fn test_insert_into_relocated_module() {
    let mut module = StpModule::simple();
    module.delta = 0x4000;
    let source = container(module.build());

    let patched =
        insert_meta_information(&source, &make_identifier("Moved")).expect("patched");
    assert_eq!(patched.size(), source.size() + IDENTIFIER_SIZE);

    let decoder = decoder();
    assert!(decoder.check(patched.data()));
    let redetected = decoder.decode(&patched).expect("redetected");
    assert_eq!(redetected.size(), patched.size());

    let (recorder, _) = record(&patched);
    assert_eq!(recorder.meta.title.as_deref(), Some("Moved"));
}

#[test]
fn test_insert_into_invalid_data() {
    let source = container(vec![0u8; 512]);
    assert!(insert_meta_information(&source, &make_identifier("x")).is_none());
}
