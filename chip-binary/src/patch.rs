//! Byte-level patching of containers
//!
//! All offsets are given in the coordinates of the *source* data, no matter
//! how many insertions were registered before. The source container is never
//! modified; [`PatchedDataBuilder::result`] produces a fresh buffer.

use std::collections::BTreeMap;

use crate::{BinaryError, Container};

/// Accumulates patch operations against a source container
#[derive(Debug)]
pub struct PatchedDataBuilder {
    source: Container,
    insertions: BTreeMap<usize, Vec<u8>>,
    overwrites: Vec<(usize, Vec<u8>)>,
    fixes: BTreeMap<usize, i32>,
}

impl PatchedDataBuilder {
    pub fn new(source: &Container) -> Self {
        Self {
            source: source.clone(),
            insertions: BTreeMap::new(),
            overwrites: Vec::new(),
            fixes: BTreeMap::new(),
        }
    }

    fn check_range(&self, offset: usize, size: usize) -> Result<(), BinaryError> {
        let limit = self.source.size();
        match offset.checked_add(size) {
            Some(end) if end <= limit => Ok(()),
            _ => Err(BinaryError::OutOfBounds {
                offset,
                size,
                limit,
            }),
        }
    }

    /// Insert `data` before the source byte at `offset`
    ///
    /// `offset == size` appends.
    pub fn insert_data(&mut self, offset: usize, data: &[u8]) -> Result<(), BinaryError> {
        self.check_range(offset, 0)?;
        if data.is_empty() {
            return Ok(());
        }
        if self.insertions.contains_key(&offset) {
            return Err(BinaryError::DuplicateInsertion(offset));
        }
        self.insertions.insert(offset, data.to_vec());
        Ok(())
    }

    /// Replace source bytes at `offset` in place
    pub fn overwrite_data(&mut self, offset: usize, data: &[u8]) -> Result<(), BinaryError> {
        self.check_range(offset, data.len())?;
        self.overwrites.push((offset, data.to_vec()));
        Ok(())
    }

    /// Add `delta` to the little-endian word at `offset`
    ///
    /// Fixes of the same word accumulate. The result wraps at 16 bits.
    pub fn fix_le_word(&mut self, offset: usize, delta: i32) -> Result<(), BinaryError> {
        self.check_range(offset, 2)?;
        let total = self.fixes.entry(offset).or_insert(0);
        *total = total.wrapping_add(delta);
        Ok(())
    }

    /// Apply fixes, then overwrites, then insertions
    pub fn result(&self) -> Container {
        let mut patched = self.source.data().to_vec();
        for (&offset, &delta) in &self.fixes {
            let word = u16::from_le_bytes([patched[offset], patched[offset + 1]]);
            let fixed = (i32::from(word).wrapping_add(delta)) as u16;
            patched[offset..offset + 2].copy_from_slice(&fixed.to_le_bytes());
        }
        for (offset, data) in &self.overwrites {
            patched[*offset..*offset + data.len()].copy_from_slice(data);
        }
        if self.insertions.is_empty() {
            return Container::new(patched);
        }

        let inserted: usize = self.insertions.values().map(Vec::len).sum();
        let mut result = Vec::with_capacity(patched.len() + inserted);
        let mut cursor = 0;
        for (&offset, data) in &self.insertions {
            result.extend_from_slice(&patched[cursor..offset]);
            result.extend_from_slice(data);
            cursor = offset;
        }
        result.extend_from_slice(&patched[cursor..]);
        Container::new(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Container {
        Container::new(vec![0x10, 0x00, 0xaa, 0xbb, 0xfe, 0xff])
    }

    #[test]
    fn test_no_operations_copies_source() {
        let data = source();
        let result = PatchedDataBuilder::new(&data).result();
        assert_eq!(result.data(), data.data());
    }

    #[test]
    fn test_fix_le_word() {
        let data = source();
        let mut patch = PatchedDataBuilder::new(&data);
        patch.fix_le_word(0, 5).expect("inside");
        patch.fix_le_word(0, 3).expect("inside");
        patch.fix_le_word(4, 2).expect("inside");
        let result = patch.result();
        assert_eq!(result.data(), &[0x18, 0x00, 0xaa, 0xbb, 0x00, 0x00]);
        assert_eq!(data.data()[0], 0x10);
    }

    #[test]
    fn test_negative_fix() {
        let data = source();
        let mut patch = PatchedDataBuilder::new(&data);
        patch.fix_le_word(0, -0x11).expect("inside");
        assert_eq!(&patch.result().data()[..2], &[0xff, 0xff]);
    }

    #[test]
    fn test_insertions_use_source_coordinates() {
        let data = source();
        let mut patch = PatchedDataBuilder::new(&data);
        patch.insert_data(4, &[1, 2]).expect("inside");
        patch.insert_data(2, &[3]).expect("inside");
        patch.insert_data(6, &[4]).expect("append");
        patch.overwrite_data(2, &[0xcc]).expect("inside");
        patch.fix_le_word(4, 1).expect("inside");
        let result = patch.result();
        assert_eq!(
            result.data(),
            &[0x10, 0x00, 3, 0xcc, 0xbb, 1, 2, 0xff, 0xff, 4]
        );
    }

    #[test]
    fn test_overwrite_wins_over_fix() {
        let data = source();
        let mut patch = PatchedDataBuilder::new(&data);
        patch.fix_le_word(2, 1).expect("inside");
        patch.overwrite_data(2, &[0, 0]).expect("inside");
        assert_eq!(&patch.result().data()[2..4], &[0, 0]);
    }

    #[test]
    fn test_rejected_operations() {
        let data = source();
        let mut patch = PatchedDataBuilder::new(&data);
        assert!(patch.insert_data(7, &[1]).is_err());
        assert!(patch.overwrite_data(5, &[1, 2]).is_err());
        assert!(patch.fix_le_word(5, 1).is_err());
        patch.insert_data(1, &[1]).expect("first");
        assert_eq!(
            patch.insert_data(1, &[2]),
            Err(BinaryError::DuplicateInsertion(1))
        );
    }
}
