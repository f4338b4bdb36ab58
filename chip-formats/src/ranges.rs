//! Byte range tracking
//!
//! While a module is parsed every structure it touches claims its bytes.
//! Claimed ranges must not overlap, and their union gives the module size
//! for formats that never declare one.

use crate::DecodeError;

/// How a checker treats a range identical to an accepted one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Any overlap is rejected, including an exact repeat
    Simple,
    /// An exact repeat is accepted, any other overlap is rejected
    Shared,
}

/// Sorted list of disjoint `[start, end)` ranges below a limit
#[derive(Debug, Clone)]
pub struct RangeChecker {
    mode: RangeMode,
    limit: usize,
    ranges: Vec<(usize, usize)>,
}

impl RangeChecker {
    pub fn new(mode: RangeMode, limit: usize) -> Self {
        Self {
            mode,
            limit,
            ranges: Vec::new(),
        }
    }

    pub fn simple(limit: usize) -> Self {
        Self::new(RangeMode::Simple, limit)
    }

    pub fn shared(limit: usize) -> Self {
        Self::new(RangeMode::Shared, limit)
    }

    /// Claim `size` bytes at `offset`
    ///
    /// Returns false if the range leaves the limit or overlaps. Empty ranges
    /// are accepted and not stored.
    pub fn add_range(&mut self, offset: usize, size: usize) -> bool {
        let Some(end) = offset.checked_add(size) else {
            return false;
        };
        if end > self.limit {
            return false;
        }
        if size == 0 {
            return true;
        }
        let idx = self.ranges.partition_point(|&(start, _)| start < offset);
        if self.mode == RangeMode::Shared && self.ranges.get(idx) == Some(&(offset, end)) {
            return true;
        }
        if idx > 0 && self.ranges[idx - 1].1 > offset {
            return false;
        }
        if self.ranges.get(idx).is_some_and(|&(start, _)| start < end) {
            return false;
        }
        self.ranges.insert(idx, (offset, end));
        true
    }

    /// Whether exactly this range was accepted before
    pub fn contains_range(&self, offset: usize, size: usize) -> bool {
        let end = offset.saturating_add(size);
        self.ranges.binary_search(&(offset, end)).is_ok()
    }

    /// Smallest `[min, max)` span covering all ranges, `(0, 0)` when empty
    pub fn affected_range(&self) -> (usize, usize) {
        match (self.ranges.first(), self.ranges.last()) {
            (Some(&(start, _)), Some(&(_, end))) => (start, end),
            _ => (0, 0),
        }
    }
}

/// Service, fixed and total range bookkeeping for one parse
///
/// Service ranges hold tables and headers. Fixed ranges hold content that
/// forms the module fingerprint. Every range also lands in the total set,
/// whose span is the module size.
#[derive(Debug, Clone)]
pub struct RangesMap {
    service: RangeChecker,
    total: RangeChecker,
    fixed: RangeChecker,
}

impl RangesMap {
    pub fn new(limit: usize) -> Self {
        Self {
            service: RangeChecker::shared(limit),
            total: RangeChecker::simple(limit),
            fixed: RangeChecker::shared(limit),
        }
    }

    pub fn add_service(&mut self, offset: usize, size: usize) -> Result<(), DecodeError> {
        let repeated = self.service.contains_range(offset, size);
        if !self.service.add_range(offset, size) {
            return Err(DecodeError::InvalidRange { offset, size });
        }
        if repeated {
            return Ok(());
        }
        self.add(offset, size)
    }

    pub fn add_fixed(&mut self, offset: usize, size: usize) -> Result<(), DecodeError> {
        let repeated = self.fixed.contains_range(offset, size);
        if !self.fixed.add_range(offset, size) {
            return Err(DecodeError::InvalidRange { offset, size });
        }
        if repeated {
            return Ok(());
        }
        self.add(offset, size)
    }

    pub fn add(&mut self, offset: usize, size: usize) -> Result<(), DecodeError> {
        tracing::trace!(start = offset, end = offset + size, "Affected range");
        if self.total.add_range(offset, size) {
            Ok(())
        } else {
            Err(DecodeError::InvalidRange { offset, size })
        }
    }

    /// End of the furthest claimed byte
    pub fn size(&self) -> usize {
        self.total.affected_range().1
    }

    pub fn fixed_area(&self) -> (usize, usize) {
        self.fixed.affected_range()
    }
}
