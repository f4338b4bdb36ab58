//! Compact sets of small integers with a declared domain

use smallvec::SmallVec;

use crate::DecodeError;

/// Set of indices within `min..=max`
///
/// Used to record which patterns, samples and ornaments a module actually
/// references. Inserting outside the domain is a structural error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indices {
    min: usize,
    max: usize,
    words: SmallVec<[u64; 4]>,
}

impl Indices {
    pub fn new(min: usize, max: usize) -> Self {
        debug_assert!(min <= max);
        let words = (max - min) / 64 + 1;
        Self {
            min,
            max,
            words: SmallVec::from_elem(0, words),
        }
    }

    pub fn domain(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    pub fn insert(&mut self, index: usize) -> Result<(), DecodeError> {
        if !(self.min..=self.max).contains(&index) {
            return Err(DecodeError::IndexOutOfDomain {
                index,
                min: self.min,
                max: self.max,
            });
        }
        let bit = index - self.min;
        self.words[bit / 64] |= 1 << (bit % 64);
        Ok(())
    }

    /// Replace contents with `items`
    pub fn assign(&mut self, items: impl IntoIterator<Item = usize>) -> Result<(), DecodeError> {
        self.clear();
        items.into_iter().try_for_each(|index| self.insert(index))
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn contains(&self, index: usize) -> bool {
        if !(self.min..=self.max).contains(&index) {
            return false;
        }
        let bit = index - self.min;
        self.words[bit / 64] & (1 << (bit % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn minimum(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn maximum(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &w)| w != 0)
            .map(|(idx, &w)| self.min + idx * 64 + 63 - w.leading_zeros() as usize)
    }

    /// Ascending iteration
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(move |(idx, &word)| {
            let base = self.min + idx * 64;
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| base + bit)
        })
    }
}
