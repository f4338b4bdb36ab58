//! Partition of a module into named areas by start address

use smallvec::SmallVec;

/// Ordered set of `(tag, address)` pairs
///
/// An area spans from its address to the nearest greater address of any
/// other area. Formats register the offsets of their tables plus an end
/// marker and then check that every table has room for its contents.
#[derive(Debug, Clone)]
pub struct AreaController<T> {
    areas: SmallVec<[(T, usize); 8]>,
}

impl<T: Copy + Eq> Default for AreaController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Eq> AreaController<T> {
    pub fn new() -> Self {
        Self {
            areas: SmallVec::new(),
        }
    }

    /// Register or move an area
    pub fn add_area(&mut self, tag: T, address: usize) {
        match self.areas.iter_mut().find(|(t, _)| *t == tag) {
            Some(area) => area.1 = address,
            None => self.areas.push((tag, address)),
        }
    }

    pub fn area_address(&self, tag: T) -> Option<usize> {
        self.areas
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|&(_, address)| address)
    }

    /// Distance to the next greater address
    ///
    /// `None` for unregistered tags and for the area at the highest address.
    pub fn area_size(&self, tag: T) -> Option<usize> {
        let address = self.area_address(tag)?;
        self.areas
            .iter()
            .map(|&(_, a)| a)
            .filter(|&a| a > address)
            .min()
            .map(|next| next - address)
    }

    /// Whether the area ends where the last registered area starts
    pub fn is_last(&self, tag: T) -> bool {
        let limit = self.areas.iter().map(|&(_, a)| a).max();
        match (self.area_address(tag), self.area_size(tag), limit) {
            (Some(address), Some(size), Some(limit)) => address + size == limit,
            _ => false,
        }
    }
}
