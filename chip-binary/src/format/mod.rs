//! Byte-pattern format detection
//!
//! A [`Format`] is compiled once from a short pattern text and then used to
//! answer two questions cheaply:
//!
//! - does this data *look like* the format ([`Format::matches`])
//! - where does the next candidate start ([`Format::next_match_offset`])
//!
//! Matching is a pre-filter only. It never proves that data is valid.
//!
//! # Pattern language
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `1f` | literal byte; `x` in place of a digit accepts any nibble |
//! | `?` | any byte |
//! | `10-1f` | inclusive range |
//! | `a\|b` | either |
//! | `a&b` | both |
//! | `%01xx0000` | bitmask, `x` accepts any bit |
//! | `'A` | ASCII symbol |
//! | `*4` | multiple of four |
//! | `(..)` | group |
//! | `{n}` | repeat previous byte or group `n` times |

mod predicate;
mod syntax;


use std::sync::OnceLock;

use crate::BinaryError;
use predicate::ByteSet;

/// Distance back to the nearest position accepting each byte value
type ShiftRow = [u8; 256];

#[derive(Debug)]
enum Matcher {
    /// Every position accepts exactly one value
    Exact(Vec<u8>),
    Fuzzy {
        predicates: Vec<ByteSet>,
        shifts: OnceLock<Vec<ShiftRow>>,
    },
}

/// Compiled byte pattern
#[derive(Debug)]
pub struct Format {
    /// Leading wildcard positions stripped from the pattern
    offset: usize,
    min_size: usize,
    matcher: Matcher,
}

impl Format {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self, BinaryError> {
        Self::with_min_size(pattern, 0)
    }

    /// Compile a pattern that additionally requires at least `min_size` bytes
    pub fn with_min_size(pattern: &str, min_size: usize) -> Result<Self, BinaryError> {
        let mut predicates = syntax::parse(pattern)?;
        let offset = predicates.iter().take_while(|p| p.is_full()).count();
        if offset == predicates.len() {
            return Err(BinaryError::InvalidPattern {
                position: 0,
                reason: "pattern accepts any data",
            });
        }
        predicates.drain(..offset);
        while predicates.last().is_some_and(ByteSet::is_full) {
            predicates.pop();
        }
        let min_size = min_size.max(offset + predicates.len());

        let exact: Option<Vec<u8>> = predicates.iter().map(ByteSet::single_value).collect();
        let matcher = match exact {
            Some(bytes) => Matcher::Exact(bytes),
            None => Matcher::Fuzzy {
                predicates,
                shifts: OnceLock::new(),
            },
        };
        Ok(Self {
            offset,
            min_size,
            matcher,
        })
    }

    /// Smallest data size that can match
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    fn pattern_len(&self) -> usize {
        match &self.matcher {
            Matcher::Exact(bytes) => bytes.len(),
            Matcher::Fuzzy { predicates, .. } => predicates.len(),
        }
    }

    /// Check whether `data` starts with the pattern
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.min_size {
            return false;
        }
        let window = &data[self.offset..self.offset + self.pattern_len()];
        match &self.matcher {
            Matcher::Exact(bytes) => window == bytes.as_slice(),
            Matcher::Fuzzy { predicates, .. } => predicates
                .iter()
                .zip(window)
                .all(|(predicate, &byte)| predicate.contains(byte)),
        }
    }

    /// Offset of the first position in `data` where the pattern matches
    pub fn search(&self, data: &[u8]) -> Option<usize> {
        let last_start = data.len().checked_sub(self.min_size)?;
        let len = self.pattern_len();
        let region = &data[self.offset..last_start + self.offset + len];
        match &self.matcher {
            Matcher::Exact(bytes) => region.windows(len).position(|w| w == bytes.as_slice()),
            Matcher::Fuzzy { predicates, shifts } => {
                let shifts = shifts.get_or_init(|| build_shifts(predicates));
                scan(region, shifts)
            }
        }
    }

    /// Offset of the next match strictly after the start of `data`
    ///
    /// Returns `data.len()` when no further match exists.
    pub fn next_match_offset(&self, data: &[u8]) -> usize {
        if data.len() <= 1 {
            return data.len();
        }
        self.search(&data[1..])
            .map_or(data.len(), |offset| offset + 1)
    }
}

fn build_shifts(predicates: &[ByteSet]) -> Vec<ShiftRow> {
    let mut rows: Vec<ShiftRow> = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let previous = rows.last().copied().unwrap_or([0; 256]);
        let mut row = [0u8; 256];
        for (value, shift) in row.iter_mut().enumerate() {
            *shift = if predicate.contains(value as u8) {
                0
            } else {
                previous[value].saturating_add(1)
            };
        }
        rows.push(row);
    }
    rows
}

/// Backward-comparing scan with per-position bad-byte shifts
fn scan(region: &[u8], shifts: &[ShiftRow]) -> Option<usize> {
    let len = shifts.len();
    let mut start = 0;
    while start + len <= region.len() {
        let window = &region[start..start + len];
        let shift = shifts
            .iter()
            .zip(window)
            .rev()
            .map(|(row, &byte)| row[usize::from(byte)])
            .find(|&shift| shift != 0);
        match shift {
            None => return Some(start),
            Some(shift) => start += usize::from(shift),
        }
    }
    None
}
