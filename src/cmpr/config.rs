//! Encoder/decoder configuration.

use serde::{Deserialize, Serialize};

use super::{PixelFormat, StreamHeader, SyntaxTable, HEADER_SIZE, MAX_DIMENSION};
use crate::error::{OsdcError, Result};
use crate::utils::{aligned_stream_size, STREAM_ALIGN};

/// Run-length field width used by the OSD compositor hardware.
pub const DEFAULT_RUN_LEN_BITS: u8 = 6;
/// Palette index width used by the OSD compositor hardware.
pub const DEFAULT_PALETTE_IDX_BITS: u8 = 3;

/// Configuration for one compressed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Frame width in pixels (1-65536).
    pub width: u32,
    /// Frame height in pixels (1-65536).
    pub height: u32,
    pub format: PixelFormat,
    /// Enable palette-indexed entries (default: true).
    pub palette_mode: bool,
    /// Clear the whole color when truncated alpha is zero.
    pub zeroize_by_alpha: bool,
    /// Low bits dropped from r/g/b (0-3).
    pub rgb_trunc_bits: u8,
    /// Low bits dropped from alpha (0-3).
    pub alpha_trunc_bits: u8,
    /// Width of the `run - 1` field (1-16, default: 6).
    pub run_len_bits: u8,
    /// Width of a palette index (1-7, default: 3).
    pub palette_idx_bits: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: PixelFormat::Argb8888,
            palette_mode: true,
            zeroize_by_alpha: false,
            rgb_trunc_bits: 0,
            alpha_trunc_bits: 0,
            run_len_bits: DEFAULT_RUN_LEN_BITS,
            palette_idx_bits: DEFAULT_PALETTE_IDX_BITS,
        }
    }
}

impl CodecConfig {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Default::default()
        }
    }

    /// Rebuild the decoder side of a configuration from a parsed header.
    /// The run-length width is not carried in the header.
    pub fn from_header(header: &StreamHeader, run_len_bits: u8) -> Self {
        Self {
            width: header.width,
            height: header.height,
            format: header.format,
            palette_mode: header.palette_mode(),
            zeroize_by_alpha: false,
            rgb_trunc_bits: header.rgb_trunc_bits,
            alpha_trunc_bits: header.alpha_trunc_bits,
            run_len_bits,
            palette_idx_bits: header.palette_idx_bits(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let too_large = self.width > MAX_DIMENSION || self.height > MAX_DIMENSION;
        if self.width == 0 || self.height == 0 || too_large {
            return Err(self.invalid_dimensions());
        }
        let check = |field, value: u8, min, max| {
            if value < min || value > max {
                Err(OsdcError::InvalidBitDepth { field, value })
            } else {
                Ok(())
            }
        };
        check("rgb_trunc_bits", self.rgb_trunc_bits, 0, 3)?;
        check("alpha_trunc_bits", self.alpha_trunc_bits, 0, 3)?;
        check("run_len_bits", self.run_len_bits, 1, 16)?;
        if self.palette_mode {
            // the header stores the cache size in 8 bits
            check("palette_idx_bits", self.palette_idx_bits, 1, 7)?;
        }
        // a frame that cannot be addressed on this target is unusable
        self.checked_scratch_size().map(|_| ())
    }

    /// Pixels in the frame, saturating at `usize::MAX`.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Size of the uncompressed frame buffer, saturating at `usize::MAX`.
    /// Exact for any configuration that passed [`validate`](Self::validate).
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.pixel_count().saturating_mul(self.format.storage_bytes())
    }

    /// Size of the uncompressed frame buffer, or `InvalidDimensions` when it
    /// does not fit in `usize`.
    pub fn checked_frame_bytes(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(self.format.storage_bytes()))
            .ok_or_else(|| self.invalid_dimensions())
    }

    fn invalid_dimensions(&self) -> OsdcError {
        OsdcError::InvalidDimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Number of palette cache slots (1 when palette mode is off).
    #[inline]
    pub fn palette_capacity(&self) -> usize {
        if self.palette_mode {
            1 << self.palette_idx_bits
        } else {
            1
        }
    }

    #[inline]
    pub fn syntax(&self) -> SyntaxTable {
        SyntaxTable::new(self.format, self.palette_mode, self.run_len_bits, self.palette_idx_bits)
    }

    pub fn header(&self) -> StreamHeader {
        StreamHeader {
            version: 0,
            format: self.format,
            palette_size: self.palette_capacity() as u8,
            alpha_trunc_bits: self.alpha_trunc_bits,
            rgb_trunc_bits: self.rgb_trunc_bits,
            width: self.width,
            height: self.height,
        }
    }

    /// Scratch buffer size for encoding this frame. Never smaller than
    /// [`max_stream_size`], and large enough for the widest entries the
    /// configuration can emit.
    pub fn scratch_size(&self) -> usize {
        self.checked_scratch_size().unwrap_or(usize::MAX)
    }

    fn checked_scratch_size(&self) -> Result<usize> {
        let pixels = (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| self.invalid_dimensions())?;
        let per_pixel = self.syntax().max_bits_per_pixel() as usize;
        let pixel_bits = (self.format.storage_bytes() * 8 + 1).max(per_pixel);
        let bits = pixels
            .checked_mul(pixel_bits)
            .and_then(|bits| bits.checked_add(HEADER_SIZE * 8))
            .ok_or_else(|| self.invalid_dimensions())?;
        // padding adds at most one block
        if bits > usize::MAX - STREAM_ALIGN * 8 {
            return Err(self.invalid_dimensions());
        }

        let worst = aligned_stream_size(HEADER_SIZE * 8 + pixels * per_pixel);
        Ok(worst.max(max_stream_size(pixels, self.format)))
    }
}

/// Conservative compressed size for `pixel_count` pixels: one extra bit per
/// stored pixel, 16-byte aligned, plus the header.
pub fn max_stream_size(pixel_count: usize, format: PixelFormat) -> usize {
    let pixel_bits = format.storage_bytes() * 8;
    let bits = pixel_count.saturating_mul(pixel_bits + 1);
    HEADER_SIZE.saturating_add(aligned_stream_size(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodecConfig::default();
        assert!(config.palette_mode);
        assert_eq!(config.run_len_bits, 6);
        assert_eq!(config.palette_idx_bits, 3);
        assert_eq!(config.palette_capacity(), 8);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let config = CodecConfig::new(16, 16, PixelFormat::Lut8);
        assert!(config.validate().is_ok());

        let bad = CodecConfig { rgb_trunc_bits: 4, ..config };
        assert!(matches!(
            bad.validate(),
            Err(OsdcError::InvalidBitDepth { field: "rgb_trunc_bits", value: 4 })
        ));

        let bad = CodecConfig { palette_idx_bits: 8, ..config };
        assert!(bad.validate().is_err());

        let no_palette = CodecConfig { palette_mode: false, palette_idx_bits: 0, ..config };
        assert!(no_palette.validate().is_ok());
        assert_eq!(no_palette.palette_capacity(), 1);
        assert!(!no_palette.header().palette_mode());

        let too_wide = CodecConfig { width: MAX_DIMENSION + 1, ..config };
        assert!(matches!(too_wide.validate(), Err(OsdcError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_max_stream_size() {
        // 16 pixels * 33 bits = 528 bits -> 5 blocks of 16 bytes
        assert_eq!(max_stream_size(16, PixelFormat::Argb8888), 8 + 80);
        let config = CodecConfig::new(4, 4, PixelFormat::Argb8888);
        assert_eq!(config.scratch_size(), 8 + 80);
    }

    #[test]
    fn test_largest_frame_size_is_checked() {
        let config = CodecConfig::new(MAX_DIMENSION, MAX_DIMENSION, PixelFormat::Argb8888);
        let expected = 65536usize.checked_mul(65536).and_then(|p| p.checked_mul(4));
        match (config.checked_frame_bytes(), expected) {
            (Ok(bytes), Some(expected)) => {
                assert_eq!(bytes, expected);
                assert!(config.validate().is_ok());
                assert_eq!(config.frame_bytes(), expected);
                assert!(config.scratch_size() > expected);
            }
            (Err(OsdcError::InvalidDimensions { width, height }), None) => {
                assert_eq!((width, height), (MAX_DIMENSION, MAX_DIMENSION));
                assert!(config.validate().is_err());
                assert_eq!(config.frame_bytes(), usize::MAX);
                assert_eq!(config.scratch_size(), usize::MAX);
            }
            (actual, expected) => panic!("got {actual:?}, expected {expected:?}"),
        }
        assert!(max_stream_size(usize::MAX, PixelFormat::Argb8888) > usize::MAX / 16);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{"width": 32, "height": 8, "format": "Argb1555", "rgb_trunc_bits": 1}"#;
        let config: CodecConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.width, 32);
        assert_eq!(config.format, PixelFormat::Argb1555);
        assert_eq!(config.rgb_trunc_bits, 1);
        assert_eq!(config.run_len_bits, DEFAULT_RUN_LEN_BITS);
    }
}
