//! Stream header: 8 bytes in front of every compressed frame.
//!
//! Bit layout (LSB-first, little-endian 64-bit word):
//! - `[0:8)` version
//! - `[8:12)` pixel format code
//! - `[12:15)` reserved
//! - `[15:23)` palette cache size
//! - `[23:25)` alpha truncation bits
//! - `[25:27)` reserved
//! - `[27:29)` rgb truncation bits
//! - `[29:31)` reserved
//! - `[31:47)` image width minus one
//! - `[47:63)` image height minus one

use byteorder::{ByteOrder, LittleEndian};

use super::PixelFormat;
use crate::error::{OsdcError, Result};
use crate::utils::ceil_log2;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest width or height the 16-bit "minus one" fields can describe.
pub const MAX_DIMENSION: u32 = 1 << 16;

/// Decoded stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Reserved, ignored by readers
    pub version: u8,
    pub format: PixelFormat,
    /// Palette cache capacity; 1 or 0 means palette mode is off
    pub palette_size: u8,
    pub alpha_trunc_bits: u8,
    pub rgb_trunc_bits: u8,
    /// Image width in pixels (1..=65536)
    pub width: u32,
    /// Image height in pixels (1..=65536)
    pub height: u32,
}

impl StreamHeader {
    /// Palette mode is signalled by a cache of more than one entry.
    #[inline]
    pub fn palette_mode(&self) -> bool {
        self.palette_size > 1
    }

    /// Index width implied by the cache size.
    #[inline]
    pub fn palette_idx_bits(&self) -> u8 {
        if self.palette_mode() {
            ceil_log2(self.palette_size as usize)
        } else {
            0
        }
    }

    /// Pack into the 64-bit header word.
    pub fn pack(&self) -> u64 {
        let width_m1 = u64::from(self.width.saturating_sub(1)) & 0xFFFF;
        let height_m1 = u64::from(self.height.saturating_sub(1)) & 0xFFFF;

        u64::from(self.version)
            | (u64::from(self.format as u8 & 0xF) << 8)
            | (u64::from(self.palette_size) << 15)
            | (u64::from(self.alpha_trunc_bits & 0x3) << 23)
            | (u64::from(self.rgb_trunc_bits & 0x3) << 27)
            | (width_m1 << 31)
            | (height_m1 << 47)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        LittleEndian::write_u64(&mut bytes, self.pack());
        bytes
    }

    /// Parse the first 8 bytes of a stream.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(OsdcError::BufferTooSmall {
                required: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let word = LittleEndian::read_u64(&data[..HEADER_SIZE]);
        let field = |shift: u32, bits: u32| (word >> shift) & ((1u64 << bits) - 1);

        let format_code = field(8, 4) as u8;
        let format = PixelFormat::try_from(format_code).map_err(OsdcError::UnsupportedFormat)?;

        Ok(Self {
            version: field(0, 8) as u8,
            format,
            palette_size: field(15, 8) as u8,
            alpha_trunc_bits: field(23, 2) as u8,
            rgb_trunc_bits: field(27, 2) as u8,
            width: field(31, 16) as u32 + 1,
            height: field(47, 16) as u32 + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> StreamHeader {
        StreamHeader {
            version: 0,
            format: PixelFormat::Argb1555,
            palette_size: 8,
            alpha_trunc_bits: 1,
            rgb_trunc_bits: 2,
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_header_round_trip() {
        let h = header();
        let parsed = StreamHeader::parse(&h.to_bytes()).unwrap();
        assert_eq!(parsed, h);
        assert!(parsed.palette_mode());
        assert_eq!(parsed.palette_idx_bits(), 3);
    }

    #[test]
    fn test_header_boundaries() {
        for (width, height) in [(1, 1), (MAX_DIMENSION, MAX_DIMENSION), (1, MAX_DIMENSION)] {
            let h = StreamHeader { width, height, ..header() };
            assert_eq!(StreamHeader::parse(&h.to_bytes()).unwrap(), h);
        }

        let h = StreamHeader { width: 1, ..header() };
        assert_eq!(h.pack() >> 31 & 0xFFFF, 0);
    }

    #[test]
    fn test_palette_size_one_disables_palette() {
        let h = StreamHeader { palette_size: 1, ..header() };
        let parsed = StreamHeader::parse(&h.to_bytes()).unwrap();
        assert!(!parsed.palette_mode());
        assert_eq!(parsed.palette_idx_bits(), 0);
    }

    #[test]
    fn test_field_positions() {
        let h = StreamHeader {
            version: 0,
            format: PixelFormat::Lut4,
            palette_size: 0,
            alpha_trunc_bits: 0,
            rgb_trunc_bits: 0,
            width: 1,
            height: 1,
        };
        assert_eq!(h.to_bytes(), [0x00, 0x0A, 0, 0, 0, 0, 0, 0]);

        let h = StreamHeader { palette_size: 0xFF, ..h };
        assert_eq!(h.pack(), (0xFFu64 << 15) | (0xA << 8));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let mut bytes = header().to_bytes();
        bytes[1] = (bytes[1] & 0xF0) | 0x3;
        assert!(matches!(StreamHeader::parse(&bytes), Err(OsdcError::UnsupportedFormat(3))));
    }

    #[test]
    fn test_short_header_rejected() {
        assert!(matches!(
            StreamHeader::parse(&[0u8; 4]),
            Err(OsdcError::BufferTooSmall { required: 8, actual: 4 })
        ));
    }
}
