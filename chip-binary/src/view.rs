//! Bounds-checked reads over raw byte slices
//!
//! Every multi-byte field is decoded explicitly with the endianness the
//! format declares. Nothing here relies on struct layout.

use crate::BinaryError;

/// Borrow `size` bytes starting at `offset`
pub fn read_bytes_at(buf: &[u8], offset: usize, size: usize) -> Result<&[u8], BinaryError> {
    offset
        .checked_add(size)
        .and_then(|end| buf.get(offset..end))
        .ok_or(BinaryError::OutOfBounds {
            offset,
            size,
            limit: buf.len(),
        })
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], BinaryError> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_bytes_at(buf, offset, N)?);
    Ok(out)
}

/// Read a single byte
pub fn read_u8_at(buf: &[u8], offset: usize) -> Result<u8, BinaryError> {
    buf.get(offset).copied().ok_or(BinaryError::OutOfBounds {
        offset,
        size: 1,
        limit: buf.len(),
    })
}

/// Read a single signed byte
pub fn read_i8_at(buf: &[u8], offset: usize) -> Result<i8, BinaryError> {
    read_u8_at(buf, offset).map(|b| b as i8)
}

/// Read a 16-bit little-endian word
pub fn read_le_u16_at(buf: &[u8], offset: usize) -> Result<u16, BinaryError> {
    read_array(buf, offset).map(u16::from_le_bytes)
}

/// Read a signed 16-bit little-endian word
pub fn read_le_i16_at(buf: &[u8], offset: usize) -> Result<i16, BinaryError> {
    read_array(buf, offset).map(i16::from_le_bytes)
}

/// Read a 16-bit big-endian word
pub fn read_be_u16_at(buf: &[u8], offset: usize) -> Result<u16, BinaryError> {
    read_array(buf, offset).map(u16::from_be_bytes)
}

/// Read a 32-bit little-endian integer
pub fn read_le_u32_at(buf: &[u8], offset: usize) -> Result<u32, BinaryError> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

/// Test a single bit
#[inline]
pub fn bit(value: u8, index: u32) -> bool {
    value & (1 << index) != 0
}

/// Extract `width` bits starting at `shift`
#[inline]
pub fn bits(value: u8, shift: u32, width: u32) -> u8 {
    ((u16::from(value) >> shift) & ((1u16 << width) - 1)) as u8
}
