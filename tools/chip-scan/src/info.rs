//! Info command - decode one module and print its structure

use anyhow::{Context, Result, bail};
use clap::Args;
use std::fmt;
use std::path::PathBuf;

use chip_formats::aym::{protracker2, soundtrackerpro};
use chip_formats::{Container, MetaBuilder, PatternBuilder};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Module file
    pub file: PathBuf,
}

/// Execute the info command
pub fn execute(args: InfoArgs) -> Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let Some((summary, module)) = describe(&chip_binary::Container::new(data)) else {
        bail!("{}: no supported module found", args.file.display());
    };
    print!("{summary}");
    println!("Size:       {} bytes", module.size());
    println!("Checksum:   {:08x}", module.checksum());
    println!("Fixed crc:  {:08x}", module.fixed_checksum());
    Ok(())
}

/// Decode `data` with every format that reports its structure
pub fn describe(data: &chip_binary::Container) -> Option<(Summary, Container)> {
    let mut summary = Summary::default();
    if let Some(module) = protracker2::parse(data, &mut summary) {
        return Some((summary, module));
    }
    let mut summary = Summary::default();
    soundtrackerpro::parse(data, &mut summary).map(|module| (summary, module))
}

#[derive(Debug, Default)]
struct Meta {
    program: String,
    title: String,
    author: String,
}

impl MetaBuilder for Meta {
    fn set_program(&mut self, program: &str) {
        self.program = program.to_string();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_author(&mut self, author: &str) {
        self.author = author.to_string();
    }
}

/// Module overview gathered while decoding
#[derive(Debug, Default)]
pub struct Summary {
    meta: Meta,
    pub tempo: u32,
    pub positions: usize,
    pub loop_position: usize,
    pub patterns: usize,
    pub lines: usize,
    pub notes: usize,
    pub samples: usize,
    pub ornaments: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program:    {}", self.meta.program)?;
        if !self.meta.title.is_empty() {
            writeln!(f, "Title:      {}", self.meta.title)?;
        }
        if !self.meta.author.is_empty() {
            writeln!(f, "Author:     {}", self.meta.author)?;
        }
        writeln!(f, "Tempo:      {}", self.tempo)?;
        writeln!(
            f,
            "Positions:  {} (loop at {})",
            self.positions, self.loop_position
        )?;
        writeln!(f, "Patterns:   {} ({} lines)", self.patterns, self.lines)?;
        writeln!(f, "Notes:      {}", self.notes)?;
        writeln!(f, "Samples:    {}", self.samples)?;
        writeln!(f, "Ornaments:  {}", self.ornaments)
    }
}

impl PatternBuilder for Summary {
    fn finish(&mut self, size: usize) {
        self.lines += size;
    }
    fn start_line(&mut self, _index: usize) {}
    fn start_channel(&mut self, _index: usize) {}
    fn set_tempo(&mut self, _tempo: u32) {}
}

impl protracker2::Builder for Summary {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        &mut self.meta
    }
    fn set_initial_tempo(&mut self, tempo: u32) {
        self.tempo = tempo;
    }
    fn set_sample(&mut self, _index: usize, _sample: protracker2::Sample) {
        self.samples += 1;
    }
    fn set_ornament(&mut self, _index: usize, _ornament: protracker2::Ornament) {
        self.ornaments += 1;
    }
    fn set_positions(&mut self, positions: protracker2::Positions) {
        self.positions = positions.size();
        self.loop_position = positions.loop_index;
    }
    fn start_pattern(&mut self, _index: usize) {
        self.patterns += 1;
    }
    fn set_rest(&mut self) {}
    fn set_note(&mut self, _note: u32) {
        self.notes += 1;
    }
    fn use_sample(&mut self, _sample: usize) {}
    fn use_ornament(&mut self, _ornament: usize) {}
    fn set_volume(&mut self, _volume: u32) {}
    fn set_glissade(&mut self, _step: i32) {}
    fn set_note_glissade(&mut self, _step: i32, _limit: u32) {}
    fn set_no_glissade(&mut self) {}
    fn set_envelope(&mut self, _kind: u32, _value: u32) {}
    fn set_no_envelope(&mut self) {}
    fn set_noise_addon(&mut self, _addon: i32) {}
}

impl soundtrackerpro::Builder for Summary {
    fn meta_builder(&mut self) -> &mut dyn MetaBuilder {
        &mut self.meta
    }
    fn set_initial_tempo(&mut self, tempo: u32) {
        self.tempo = tempo;
    }
    fn set_sample(&mut self, _index: usize, _sample: soundtrackerpro::Sample) {
        self.samples += 1;
    }
    fn set_ornament(&mut self, _index: usize, _ornament: soundtrackerpro::Ornament) {
        self.ornaments += 1;
    }
    fn set_positions(&mut self, positions: soundtrackerpro::Positions) {
        self.positions = positions.size();
        self.loop_position = positions.loop_index;
    }
    fn start_pattern(&mut self, _index: usize) {
        self.patterns += 1;
    }
    fn set_rest(&mut self) {}
    fn set_note(&mut self, _note: u32) {
        self.notes += 1;
    }
    fn use_sample(&mut self, _sample: usize) {}
    fn use_ornament(&mut self, _ornament: usize) {}
    fn set_envelope(&mut self, _kind: u32, _value: u32) {}
    fn set_no_envelope(&mut self) {}
    fn set_glissade(&mut self, _step: i32) {}
    fn set_volume(&mut self, _volume: u32) {}
}
