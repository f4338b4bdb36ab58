//! chip-binary: byte-level building blocks for chiptune format decoders
//!
//! This crate holds everything a decoder needs before it knows anything
//! about trackers, patterns or samples:
//!
//! - **Views**: bounds-checked little/big-endian reads over `&[u8]`
//! - **Containers**: reference-counted immutable byte regions with CRC32
//! - **Formats**: a tiny byte-pattern language compiled into a matcher,
//!   used to reject non-candidates cheaply and to scan archives
//! - **Patching**: insert/overwrite/fixup operations that produce a fresh
//!   buffer without touching the source
//!
//! # Usage
//!
//! ```ignore
//! use chip_binary::{Container, Format};
//!
//! let format = Format::new("'P'T'2 ?{2} 01-1f")?;
//! let data = Container::new(std::fs::read("song.pt2")?);
//! if format.matches(data.data()) {
//!     println!("crc32: {:08x}", data.checksum());
//! }
//! ```

mod container;
mod error;
pub mod format;
mod patch;
pub mod view;

pub use container::{Container, crc32};
pub use error::BinaryError;
pub use format::Format;
pub use patch::PatchedDataBuilder;
