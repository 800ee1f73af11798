//! Canvas rasterizer.
//!
//! A canvas is described by its size, pixel format and background color.
//! Draw objects (rectangles, thick lines and bitmaps) are rasterized one row
//! at a time straight into the compressed stream, or painted into a raw
//! buffer with the same coverage rules.

mod draw;
mod object;
mod slice;

pub use draw::*;
pub use object::*;
pub use slice::*;

use serde::{Deserialize, Serialize};

use crate::cmpr::{encode_frame, get_color, set_color, CodecConfig, Color, PixelFormat};
use crate::error::{OsdcError, Result};

/// Canvas geometry and background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasAttr {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Background color code in `format`'s native layout
    #[serde(default)]
    pub bg_color_code: u32,
}

impl CanvasAttr {
    pub fn new(width: u32, height: u32, format: PixelFormat, bg_color_code: u32) -> Self {
        Self {
            width,
            height,
            format,
            bg_color_code,
        }
    }

    #[inline]
    pub fn background(&self) -> Color {
        self.format.unpack(self.bg_color_code)
    }

    /// Codec settings used for every canvas stream: palette on, default
    /// field widths, no truncation.
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig::new(self.width, self.height, self.format)
    }

    pub fn validate(&self) -> Result<()> {
        self.codec_config().validate()
    }

    /// Size of a raw pixel buffer for this canvas.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.codec_config().frame_bytes()
    }
}

/// An owned raw canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    attr: CanvasAttr,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Allocate a canvas filled with its background color.
    pub fn new(attr: CanvasAttr) -> Result<Self> {
        attr.validate()?;
        let mut pixels = vec![0u8; attr.frame_bytes()];
        let background = attr.background();
        for pixel in pixels.chunks_exact_mut(attr.format.storage_bytes()) {
            set_color(pixel, background, attr.format);
        }
        Ok(Self { attr, pixels })
    }

    /// Wrap an existing pixel buffer.
    pub fn from_pixels(attr: CanvasAttr, pixels: Vec<u8>) -> Result<Self> {
        attr.validate()?;
        if pixels.len() < attr.frame_bytes() {
            return Err(OsdcError::BufferTooSmall {
                required: attr.frame_bytes(),
                actual: pixels.len(),
            });
        }
        Ok(Self { attr, pixels })
    }

    #[inline]
    pub fn attr(&self) -> &CanvasAttr {
        &self.attr
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.attr.width || y >= self.attr.height {
            return None;
        }
        let pel = self.attr.format.storage_bytes();
        let offset = (y as usize * self.attr.width as usize + x as usize) * pel;
        Some(get_color(&self.pixels[offset..offset + pel], self.attr.format))
    }

    /// Repaint the whole canvas with `objects` over the background.
    pub fn draw(&mut self, objects: &[DrawObject]) -> Result<()> {
        draw_canvas(&self.attr, objects, &mut self.pixels)
    }

    /// Compress the current contents.
    pub fn compress(&self) -> Result<Vec<u8>> {
        let mut pixels = self.pixels.clone();
        encode_frame(&mut pixels, &self.attr.codec_config())
    }
}
