pub mod errors;

pub use errors::HeaderError;

/// Fail with `BufferTooSmall` unless `buf` holds at least `expected` bytes.
pub(crate) fn require_len(buf: &[u8], expected: usize) -> Result<(), HeaderError> {
    if buf.len() < expected {
        return Err(HeaderError::BufferTooSmall { expected, found: buf.len() });
    }
    Ok(())
}

/// Accumulate `data` as big-endian 16-bit words into a one's complement sum.
/// An odd trailing byte is padded with zero.
pub(crate) fn ones_complement_sum(mut sum: u32, data: &[u8]) -> u32 {
    for chunk in data.chunks(2) {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += word as u32;
    }
    sum
}

/// Fold the carry bits of a one's complement sum and invert it.
pub(crate) fn fold_checksum(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

// Unit test helpers
