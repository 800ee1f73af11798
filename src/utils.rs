//! Utility functions for bit arithmetic and buffer sizing.

/// Compressed streams are always padded to this many bytes.
pub const STREAM_ALIGN: usize = 16;

#[inline]
pub fn clamp<T: Ord>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Round a bit count up to whole bytes, padded to a 16-byte boundary.
/// Saturates instead of wrapping for bit counts near `usize::MAX`.
#[inline]
pub fn aligned_stream_size(bits: usize) -> usize {
    bits.div_ceil(STREAM_ALIGN * 8).saturating_mul(STREAM_ALIGN)
}

/// Smallest `n` such that `1 << n >= value`.
#[inline]
pub fn ceil_log2(value: usize) -> u8 {
    let mut bits = 0u8;
    while (1usize << bits) < value {
        bits += 1;
    }
    bits
}

/// Mask with the low `bits` bits set.
#[inline]
pub fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
