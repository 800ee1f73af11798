//! Bit-granular stream writer and reader.
//!
//! Bits are packed LSB-first: the first bit written lands in bit 0 of byte 0.
//! The writer never touches memory past its capacity. A write that would cross
//! the end still advances the cursor and flags the stream as overflowed, so the
//! final cursor position is the true size of the stream.

use crate::utils::low_mask;

/// Largest chunk packed by a single low-level write.
const MAX_CHUNK_BITS: u32 = 16;

/// Bit writer over an owned, zero-filled buffer.
#[derive(Debug, Clone)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
    overflowed: bool,
}

impl BitWriter {
    /// Create a writer with `capacity` zeroed bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            bit_pos: 0,
            overflowed: false,
        }
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.buf.len().saturating_mul(8)
    }

    /// True once any write crossed the end of the buffer.
    #[inline]
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Write the low `bit_len` bits of `bits` (at most 64).
    pub fn write(&mut self, bits: u64, bit_len: u32) {
        debug_assert!(bit_len <= 64);
        let next_bit_pos = self.bit_pos.saturating_add(bit_len as usize);

        if next_bit_pos <= self.capacity_bits() {
            let mut value = bits & low_mask(bit_len);
            let mut pos = self.bit_pos;
            let mut remaining = bit_len;
            while remaining > 0 {
                let chunk = remaining.min(MAX_CHUNK_BITS);
                self.write_chunk(pos, value as u16, chunk);
                value >>= chunk;
                pos += chunk as usize;
                remaining -= chunk;
            }
        } else {
            self.overflowed = true;
        }
        self.bit_pos = next_bit_pos;
    }

    /// Advance the cursor without writing, clamped to the capacity.
    pub fn skip(&mut self, bit_len: u32) {
        self.bit_pos = self.bit_pos.saturating_add(bit_len as usize).min(self.capacity_bits());
    }

    /// OR up to 16 bits into the buffer starting at `bit_pos`.
    fn write_chunk(&mut self, bit_pos: usize, chunk: u16, bit_len: u32) {
        let mut value = u32::from(chunk) & low_mask(bit_len) as u32;
        let mut pos = bit_pos;
        let mut remaining = bit_len;
        while remaining > 0 {
            let shift = (pos & 7) as u32;
            let take = remaining.min(8 - shift);
            self.buf[pos >> 3] |= ((value & low_mask(take) as u32) << shift) as u8;
            value >>= take;
            pos += take as usize;
            remaining -= take;
        }
    }

    /// Bytes written so far, rounded up to a whole byte.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.bit_pos.div_ceil(8).min(self.buf.len());
        &self.buf[..len]
    }

    /// Consume the writer and return the whole backing buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Read-only bit cursor over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    #[inline]
    pub fn capacity_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// True when the cursor has reached the end of the data.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.bit_pos >= self.capacity_bits()
    }

    /// Read `bit_len` bits (at most 32) without advancing.
    /// Bits past the end of the data read as zero.
    pub fn peek(&self, bit_len: u32) -> u32 {
        debug_assert!(bit_len <= 32);
        let mut value = 0u32;
        for bit in 0..bit_len as usize {
            let pos = self.bit_pos + bit;
            let byte = match self.data.get(pos >> 3) {
                Some(&b) => b,
                None => break,
            };
            value |= u32::from((byte >> (pos & 7)) & 1) << bit;
        }
        value
    }

    /// Read `bit_len` bits and advance, clamped to the capacity.
    pub fn read(&mut self, bit_len: u32) -> u32 {
        let value = self.peek(bit_len);
        self.skip(bit_len);
        value
    }

    /// Advance the cursor, clamped to the capacity.
    pub fn skip(&mut self, bit_len: u32) {
        self.bit_pos = self.bit_pos.saturating_add(bit_len as usize).min(self.capacity_bits());
    }
}
