//! Immutable, reference-counted byte containers

use std::fmt;
use std::sync::Arc;

/// CRC32 (IEEE) of a byte slice
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Contiguous immutable byte region
///
/// Cloning is cheap: subcontainers share the underlying allocation.
#[derive(Clone)]
pub struct Container {
    data: Arc<[u8]>,
    offset: usize,
    size: usize,
}

impl Container {
    /// Wrap owned bytes
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let size = data.len();
        Self {
            data,
            offset: 0,
            size,
        }
    }

    /// Visible bytes
    pub fn data(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.size]
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Share a part of this container
    ///
    /// `size` is clamped to the available data. Returns `None` when
    /// `offset` is past the end or the result would be empty.
    pub fn sub_container(&self, offset: usize, size: usize) -> Option<Container> {
        if offset >= self.size || size == 0 {
            return None;
        }
        Some(Container {
            data: Arc::clone(&self.data),
            offset: self.offset + offset,
            size: size.min(self.size - offset),
        })
    }

    /// CRC32 of the visible bytes
    pub fn checksum(&self) -> u32 {
        crc32(self.data())
    }
}

impl AsRef<[u8]> for Container {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

impl From<Vec<u8>> for Container {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Container {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_container_shares_data() {
        let data = Container::new(vec![1u8, 2, 3, 4, 5]);
        let sub = data.sub_container(1, 3).expect("inside");
        assert_eq!(sub.data(), &[2, 3, 4]);

        let nested = sub.sub_container(2, 100).expect("clamped");
        assert_eq!(nested.data(), &[4]);
        assert!(Arc::ptr_eq(&data.data, &nested.data));
    }

    #[test]
    fn test_sub_container_outside() {
        let data = Container::new(vec![1u8, 2, 3]);
        assert!(data.sub_container(3, 1).is_none());
        assert!(data.sub_container(0, 0).is_none());
    }

    #[test]
    fn test_checksum() {
        // Standard CRC32 check value
        let data = Container::from(&b"123456789"[..]);
        assert_eq!(data.checksum(), 0xcbf4_3926);
        assert_eq!(data.sub_container(0, 9).map(|c| c.checksum()), Some(0xcbf4_3926));
        assert_ne!(data.sub_container(1, 8).map(|c| c.checksum()), Some(0xcbf4_3926));
    }
}
