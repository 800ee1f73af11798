//! Pixel formats and color conversion.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Pixel formats understood by the OSD compositor.
///
/// The discriminant is the 4-bit format code carried in the stream header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit, 8 bits per channel
    Argb8888 = 0,
    /// 16-bit, 4 bits per channel
    Argb4444 = 4,
    /// 16-bit, 5 bits per color channel and a 1-bit alpha
    Argb1555 = 5,
    /// 8-bit lookup table index
    Lut8 = 8,
    /// 4-bit lookup table index
    Lut4 = 10,
}

impl TryFrom<u8> for PixelFormat {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PixelFormat::Argb8888),
            4 => Ok(PixelFormat::Argb4444),
            5 => Ok(PixelFormat::Argb1555),
            8 => Ok(PixelFormat::Lut8),
            10 => Ok(PixelFormat::Lut4),
            _ => Err(value),
        }
    }
}

impl PixelFormat {
    /// Width of one pixel in the compressed stream.
    #[inline]
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Argb8888 => 32,
            PixelFormat::Argb4444 | PixelFormat::Argb1555 => 16,
            PixelFormat::Lut8 => 8,
            PixelFormat::Lut4 => 4,
        }
    }

    /// Bytes one pixel occupies in a canvas buffer.
    /// LUT4 canvases keep one index per byte.
    #[inline]
    pub fn storage_bytes(self) -> usize {
        match self {
            PixelFormat::Argb8888 => 4,
            PixelFormat::Argb4444 | PixelFormat::Argb1555 => 2,
            PixelFormat::Lut8 | PixelFormat::Lut4 => 1,
        }
    }

    /// Pack a color into this format's native code.
    pub fn pack(self, color: Color) -> u32 {
        let Color { r, g, b, a } = color;
        let (r, g, b, a) = (r as u32, g as u32, b as u32, a as u32);
        match self {
            PixelFormat::Argb8888 => (a << 24) | (r << 16) | (g << 8) | b,
            PixelFormat::Argb4444 => {
                ((a & 0xF) << 12) | ((r & 0xF) << 8) | ((g & 0xF) << 4) | (b & 0xF)
            }
            PixelFormat::Argb1555 => {
                ((a & 0x1) << 15) | ((r & 0x1F) << 10) | ((g & 0x1F) << 5) | (b & 0x1F)
            }
            PixelFormat::Lut8 => a,
            PixelFormat::Lut4 => a & 0xF,
        }
    }

    /// Unpack a native code of this format into a color.
    pub fn unpack(self, code: u32) -> Color {
        match self {
            PixelFormat::Argb8888 => Color {
                b: code as u8,
                g: (code >> 8) as u8,
                r: (code >> 16) as u8,
                a: (code >> 24) as u8,
            },
            PixelFormat::Argb4444 => Color {
                b: (code & 0xF) as u8,
                g: ((code >> 4) & 0xF) as u8,
                r: ((code >> 8) & 0xF) as u8,
                a: ((code >> 12) & 0xF) as u8,
            },
            PixelFormat::Argb1555 => Color {
                b: (code & 0x1F) as u8,
                g: ((code >> 5) & 0x1F) as u8,
                r: ((code >> 10) & 0x1F) as u8,
                a: ((code >> 15) & 0x1) as u8,
            },
            PixelFormat::Lut8 => Color::index(code as u8),
            PixelFormat::Lut4 => Color::index((code & 0xF) as u8),
        }
    }
}

/// A color in the native channel precision of its pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Lookup-table entry: the index lives in the alpha channel.
    pub const fn index(index: u8) -> Self {
        Self { r: 0, g: 0, b: 0, a: index }
    }

    /// Gray level with every channel set to `level`.
    pub const fn gray(level: u8) -> Self {
        Self { r: level, g: level, b: level, a: level }
    }

    /// Drop the low bits of each channel and optionally clear the whole
    /// color when alpha ends up zero.
    #[inline]
    pub fn truncated(
        self,
        rgb_trunc_bits: u8,
        alpha_trunc_bits: u8,
        zeroize_by_alpha: bool,
    ) -> Self {
        let trunc = |v: u8, n: u8| if n >= 8 { 0 } else { (v >> n) << n };
        let color = Color {
            r: trunc(self.r, rgb_trunc_bits),
            g: trunc(self.g, rgb_trunc_bits),
            b: trunc(self.b, rgb_trunc_bits),
            a: trunc(self.a, alpha_trunc_bits),
        };
        if zeroize_by_alpha && color.a == 0 {
            Color::TRANSPARENT
        } else {
            color
        }
    }
}

/// Read one pixel. `bytes` must hold at least `format.storage_bytes()`.
#[inline]
pub fn get_color(bytes: &[u8], format: PixelFormat) -> Color {
    let code = match format.storage_bytes() {
        4 => LittleEndian::read_u32(bytes),
        2 => u32::from(LittleEndian::read_u16(bytes)),
        _ => u32::from(bytes[0]),
    };
    format.unpack(code)
}

/// Write one pixel. `bytes` must hold at least `format.storage_bytes()`.
#[inline]
pub fn set_color(bytes: &mut [u8], color: Color, format: PixelFormat) {
    let code = format.pack(color);
    match format.storage_bytes() {
        4 => LittleEndian::write_u32(bytes, code),
        2 => LittleEndian::write_u16(bytes, code as u16),
        _ => bytes[0] = code as u8,
    }
}

/// Truncate the pixel in place and return the resulting color.
///
/// Every comparison made by the encoder happens on preprocessed colors.
pub fn preprocess(
    bytes: &mut [u8],
    format: PixelFormat,
    rgb_trunc_bits: u8,
    alpha_trunc_bits: u8,
    zeroize_by_alpha: bool,
) -> Color {
    let color =
        get_color(bytes, format).truncated(rgb_trunc_bits, alpha_trunc_bits, zeroize_by_alpha);
    set_color(bytes, color, format);
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FORMATS: [PixelFormat; 5] = [
        PixelFormat::Argb8888,
        PixelFormat::Argb4444,
        PixelFormat::Argb1555,
        PixelFormat::Lut8,
        PixelFormat::Lut4,
    ];

    #[test]
    fn test_format_codes() {
        for format in ALL_FORMATS {
            assert_eq!(PixelFormat::try_from(format as u8), Ok(format));
        }
        assert_eq!(PixelFormat::try_from(3), Err(3));
    }

    #[test]
    fn test_argb8888_byte_order() {
        let mut buf = [0u8; 4];
        set_color(&mut buf, Color::new(0x11, 0x22, 0x33, 0x44), PixelFormat::Argb8888);
        assert_eq!(buf, [0x33, 0x22, 0x11, 0x44]);
        assert_eq!(get_color(&buf, PixelFormat::Argb8888), Color::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_argb1555_fields() {
        let color = PixelFormat::Argb1555.unpack(0xFC00);
        assert_eq!(color, Color::new(0x1F, 0, 0, 1));
        assert_eq!(PixelFormat::Argb1555.pack(color), 0xFC00);
    }

    #[test]
    fn test_lut4_reads_low_nibble() {
        let buf = [0xA7];
        assert_eq!(get_color(&buf, PixelFormat::Lut4), Color::index(0x7));
        assert_eq!(get_color(&buf, PixelFormat::Lut8), Color::index(0xA7));
    }

    #[test]
    fn test_preprocess_truncates_in_place() {
        let mut buf = [0xFF, 0x81, 0x7F, 0x93];
        let color = preprocess(&mut buf, PixelFormat::Argb8888, 2, 1, false);
        assert_eq!(color, Color::new(0x7C, 0x80, 0xFC, 0x92));
        assert_eq!(buf, [0xFC, 0x80, 0x7C, 0x92]);
    }

    #[test]
    fn test_preprocess_zeroize_by_alpha() {
        let mut buf = [0xFF, 0xFF, 0xFF, 0x01];
        let color = preprocess(&mut buf, PixelFormat::Argb8888, 0, 1, true);
        assert_eq!(color, Color::TRANSPARENT);
        assert_eq!(buf, [0, 0, 0, 0]);
    }

    #[test]
    fn test_preprocess_idempotent() {
        for format in ALL_FORMATS {
            for rgb in 0..4u8 {
                for alpha in 0..4u8 {
                    for zeroize in [false, true] {
                        for seed in [0x0000_0000u32, 0x8123_4567, 0xFFFF_FFFF, 0x01FE_7F80] {
                            let mut buf = seed.to_le_bytes();
                            let once = preprocess(&mut buf, format, rgb, alpha, zeroize);
                            let twice = preprocess(&mut buf, format, rgb, alpha, zeroize);
                            assert_eq!(once, twice, "{format:?} rgb={rgb} alpha={alpha}");
                        }
                    }
                }
            }
        }
    }
}
