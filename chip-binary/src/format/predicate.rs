//! Per-position byte predicates as 256-bit sets

/// Set of byte values accepted at one pattern position
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ByteSet([u64; 4]);

impl ByteSet {
    pub const EMPTY: ByteSet = ByteSet([0; 4]);
    pub const FULL: ByteSet = ByteSet([u64::MAX; 4]);

    pub fn single(value: u8) -> Self {
        let mut set = Self::EMPTY;
        set.insert(value);
        set
    }

    /// Inclusive range
    pub fn range(lo: u8, hi: u8) -> Self {
        Self::from_fn(|v| (lo..=hi).contains(&v))
    }

    pub fn from_fn(mut accept: impl FnMut(u8) -> bool) -> Self {
        let mut set = Self::EMPTY;
        for value in 0..=u8::MAX {
            if accept(value) {
                set.insert(value);
            }
        }
        set
    }

    fn insert(&mut self, value: u8) {
        self.0[usize::from(value >> 6)] |= 1 << (value & 63);
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        self.0[usize::from(value >> 6)] & (1 << (value & 63)) != 0
    }

    pub fn union(self, other: Self) -> Self {
        let mut out = self;
        for (dst, src) in out.0.iter_mut().zip(other.0) {
            *dst |= src;
        }
        out
    }

    pub fn intersection(self, other: Self) -> Self {
        let mut out = self;
        for (dst, src) in out.0.iter_mut().zip(other.0) {
            *dst &= src;
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn is_full(&self) -> bool {
        *self == Self::FULL
    }

    /// The only accepted value, if exactly one
    pub fn single_value(&self) -> Option<u8> {
        let count: u32 = self.0.iter().map(|w| w.count_ones()).sum();
        if count != 1 {
            return None;
        }
        (0..=u8::MAX).find(|&v| self.contains(v))
    }
}

impl std::fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.single_value() {
            Some(value) => write!(f, "{value:02x}"),
            None if self.is_full() => write!(f, "?"),
            None => write!(
                f,
                "[{:016x}{:016x}{:016x}{:016x}]",
                self.0[3], self.0[2], self.0[1], self.0[0]
            ),
        }
    }
}
