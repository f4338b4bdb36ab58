//! chip-formats: decoding framework for tracker-style chiptune modules
//!
//! Historical tracker formats were designed for 8-bit machines, not for
//! robustness. Files found in the wild are truncated, patched by hand or
//! glued into archives. This crate provides the shared machinery that makes
//! decoding them safe, and the format decoders built on it.
//!
//! # Pipeline
//!
//! ```text
//! raw bytes -> Format::matches      cheap byte-pattern pre-filter
//!           -> fast check           header fields and area ordering
//!           -> parse                drives a Builder, claims byte ranges
//!           -> Container            inferred size + fixed-area checksum
//! ```
//!
//! Every step can reject the data. Rejection is a normal outcome and
//! callers simply try the next [`Decoder`].
//!
//! # Building blocks
//!
//! - [`RangesMap`] / [`RangeChecker`]: non-overlapping byte range tracking
//! - [`AreaController`]: partition of a module by table addresses
//! - [`Indices`]: sets of referenced patterns, samples and ornaments
//! - [`StatisticCollectingBuilder`]: decorator collecting usage sets
//! - [`pattern::parse_pattern`]: the multi-channel cursor engine
//!
//! # Usage
//!
//! ```ignore
//! use chip_formats::{Decoder, all_decoders};
//!
//! let data = chip_binary::Container::new(std::fs::read("song.pt2")?);
//! for decoder in all_decoders()? {
//!     if let Some(module) = decoder.decode(&data) {
//!         println!("{}: {} bytes, fixed crc {:08x}",
//!             decoder.description(), module.size(), module.fixed_checksum());
//!     }
//! }
//! ```

mod areas;
pub mod aym;
mod builder;
mod container;
mod decoder;
mod error;
mod indices;
mod objects;
pub mod pattern;
mod ranges;
pub mod scan;
mod statistics;
pub mod strings;

pub use areas::AreaController;
pub use builder::{MetaBuilder, PatternBuilder, StubMetaBuilder};
pub use container::Container;
pub use decoder::{Decoder, all_decoders};
pub use error::DecodeError;
pub use indices::Indices;
pub use objects::LinesObject;
pub use ranges::{RangeChecker, RangeMode, RangesMap};
pub use statistics::{StatisticCollectingBuilder, UsageLimits};
