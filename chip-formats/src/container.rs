//! Decoded module containers

use chip_binary::crc32;

/// A successfully parsed module
///
/// Wraps exactly the bytes the module occupies, plus the span of content
/// bytes that form its fingerprint.
#[derive(Debug, Clone)]
pub struct Container {
    data: chip_binary::Container,
    fixed_offset: usize,
    fixed_size: usize,
}

impl Container {
    /// Wrap module bytes with the fixed area `[fixed_offset, fixed_offset + fixed_size)`
    pub fn new(data: chip_binary::Container, fixed_offset: usize, fixed_size: usize) -> Self {
        Self {
            data,
            fixed_offset,
            fixed_size,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn binary(&self) -> &chip_binary::Container {
        &self.data
    }

    pub fn into_binary(self) -> chip_binary::Container {
        self.data
    }

    pub fn sub_container(&self, offset: usize, size: usize) -> Option<chip_binary::Container> {
        self.data.sub_container(offset, size)
    }

    /// CRC32 over the whole module
    pub fn checksum(&self) -> u32 {
        self.data.checksum()
    }

    /// `(offset, size)` of the content area
    pub fn fixed_area(&self) -> (usize, usize) {
        (self.fixed_offset, self.fixed_size)
    }

    /// CRC32 over the content area only
    ///
    /// Stable across edits of titles and other metadata. Falls back to the
    /// whole-module checksum when no content area was recorded.
    pub fn fixed_checksum(&self) -> u32 {
        if self.fixed_size == 0 {
            return self.checksum();
        }
        self.data()
            .get(self.fixed_offset..self.fixed_offset + self.fixed_size)
            .map_or_else(|| self.checksum(), crc32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_checksum_covers_area_only() {
        let bytes = b"TITLE123456789".to_vec();
        let module = Container::new(chip_binary::Container::new(bytes), 5, 9);
        assert_eq!(module.fixed_checksum(), 0xcbf4_3926);
        assert_eq!(module.size(), 14);
        assert_ne!(module.checksum(), module.fixed_checksum());

        let renamed = Container::new(chip_binary::Container::new(b"OTHER123456789".to_vec()), 5, 9);
        assert_eq!(renamed.fixed_checksum(), module.fixed_checksum());
        assert_ne!(renamed.checksum(), module.checksum());
    }

    #[test]
    fn test_empty_fixed_area_falls_back() {
        let module = Container::new(chip_binary::Container::new(b"123456789".to_vec()), 0, 0);
        assert_eq!(module.fixed_checksum(), module.checksum());
    }
}
