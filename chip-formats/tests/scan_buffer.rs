//! Scanning buffers with embedded modules.

mod module_generator;

use chip_formats::scan::scan_buffer;
use chip_formats::{Decoder, all_decoders};

use module_generator::{Pt2Module, StpModule};

#[test]
fn test_finds_embedded_modules() {
    let pt2 = Pt2Module::simple().build();
    let mut stp = StpModule::simple();
    stp.title = Some("Embedded".to_string());
    let stp = stp.build();

    let mut data = vec![0u8; 100];
    data.extend_from_slice(&pt2);
    data.extend_from_slice(&[0u8; 50]);
    data.extend_from_slice(&stp);
    data.extend_from_slice(&[0u8; 30]);

    let decoders = all_decoders().expect("valid");
    let hits = scan_buffer(&decoders, &chip_binary::Container::new(data));

    let found: Vec<_> = hits
        .iter()
        .map(|hit| (hit.offset, hit.description, hit.size))
        .collect();
    assert_eq!(
        found,
        vec![
            (100, "Pro Tracker v2.x", pt2.len()),
            (100 + pt2.len() + 50, "Sound Tracker Pro Compiled", stp.len()),
        ]
    );

    let standalone = decoders[0]
        .decode(&chip_binary::Container::new(pt2))
        .expect("decoded");
    assert_eq!(hits[0].checksum, standalone.checksum());
    assert_eq!(hits[0].fixed_checksum, standalone.fixed_checksum());
}

#[test]
fn test_module_at_buffer_end() {
    let pt2 = Pt2Module::simple().build();
    let mut data = vec![0xffu8; 7];
    data.extend_from_slice(&pt2);

    let decoders = all_decoders().expect("valid");
    let hits = scan_buffer(&decoders, &chip_binary::Container::new(data));

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].offset, 7);
}
