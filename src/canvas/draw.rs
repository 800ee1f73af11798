//! Size estimation and drawing.

use std::borrow::Cow;

use log::debug;

use super::{CanvasAttr, DrawObject, RowSlicer};
use crate::cmpr::{
    decode_frame_to_vec, encode_frame_into, get_color, set_color, Color, PixelFormat, RunEncoder,
    StreamHeader, DEFAULT_RUN_LEN_BITS, HEADER_SIZE,
};
use crate::error::{OsdcError, Result};
use crate::utils::aligned_stream_size;

/// Destination of rasterized rows, fed left to right, top to bottom.
trait RowSink {
    fn solid(&mut self, color: Color, len: usize) -> Result<()>;
    /// Raw pixels in the canvas format.
    fn pixels(&mut self, data: &[u8]) -> Result<()>;
}

struct StreamSink {
    encoder: RunEncoder,
    format: PixelFormat,
}

impl RowSink for StreamSink {
    fn solid(&mut self, color: Color, len: usize) -> Result<()> {
        self.encoder.push_span(color, len)
    }

    fn pixels(&mut self, data: &[u8]) -> Result<()> {
        for pixel in data.chunks_exact(self.format.storage_bytes()) {
            self.encoder.push_pixel(get_color(pixel, self.format))?;
        }
        Ok(())
    }
}

struct BufferSink<'b> {
    out: std::slice::ChunksExactMut<'b, u8>,
    format: PixelFormat,
}

impl RowSink for BufferSink<'_> {
    fn solid(&mut self, color: Color, len: usize) -> Result<()> {
        for pixel in self.out.by_ref().take(len) {
            set_color(pixel, color, self.format);
        }
        Ok(())
    }

    fn pixels(&mut self, data: &[u8]) -> Result<()> {
        let format = self.format;
        let src = data.chunks_exact(format.storage_bytes());
        for (src, dst) in src.zip(self.out.by_ref()) {
            set_color(dst, get_color(src, format), format);
        }
        Ok(())
    }
}

/// Upper bound on the compressed size of `objects` drawn on `canvas`.
///
/// Solid slices are charged one widest entry per maximal run, bitmap slices
/// one widest entry per pixel. Runs that continue across slice or row
/// boundaries only make the real stream smaller.
pub fn estimate_canvas_size(canvas: &CanvasAttr, objects: &[DrawObject]) -> Result<usize> {
    let config = canvas.codec_config();
    config.validate()?;
    let table = config.syntax();
    let entry_bits = table.max_entry_bits() as usize;
    let max_run = table.max_run();

    let mut slicer = RowSlicer::new(objects, canvas.width);
    let mut bits = HEADER_SIZE * 8;
    for y in 0..canvas.height as i32 {
        for slice in slicer.row(y) {
            let is_bitmap = slice
                .owner
                .is_some_and(|id| objects[id].bitmap_attr().is_some());
            let entries = if is_bitmap {
                slice.len()
            } else {
                slice.len().div_ceil(max_run)
            };
            bits = bits.saturating_add(entries.saturating_mul(entry_bits));
        }
    }
    Ok(aligned_stream_size(bits))
}

/// Rasterize `objects` straight into a compressed stream in `out`.
///
/// Returns the number of bytes written. If the stream does not fit, `out`
/// is left untouched and the error carries the real size; drawing the same
/// canvas with no objects is the expected fallback.
pub fn draw_cmpr_canvas(
    canvas: &CanvasAttr,
    objects: &[DrawObject],
    out: &mut [u8],
) -> Result<usize> {
    let config = canvas.codec_config();
    config.validate()?;

    let mut sink = StreamSink {
        encoder: RunEncoder::new(&config, out.len()),
        format: canvas.format,
    };
    rasterize(canvas, objects, &mut sink)?;

    let stream = sink.encoder.finish()?;
    if stream.len() > out.len() {
        return Err(OsdcError::InsufficientCapacity {
            required: stream.len(),
            capacity: out.len(),
        });
    }
    out[..stream.len()].copy_from_slice(&stream);

    debug!(
        "drew {} objects on {}x{} {:?} canvas: {} bytes",
        objects.len(),
        canvas.width,
        canvas.height,
        canvas.format,
        stream.len()
    );
    Ok(stream.len())
}

/// Paint `objects` over the background into a raw pixel buffer.
pub fn draw_canvas(
    canvas: &CanvasAttr,
    objects: &[DrawObject],
    pixels: &mut [u8],
) -> Result<()> {
    canvas.validate()?;
    let frame_bytes = canvas.frame_bytes();
    if pixels.len() < frame_bytes {
        return Err(OsdcError::BufferTooSmall {
            required: frame_bytes,
            actual: pixels.len(),
        });
    }

    let mut sink = BufferSink {
        out: pixels[..frame_bytes].chunks_exact_mut(canvas.format.storage_bytes()),
        format: canvas.format,
    };
    rasterize(canvas, objects, &mut sink)
}

/// Compress a `width` x `height` bitmap in the canvas format, for use as a
/// compressed bitmap object. Returns the number of bytes written to `out`.
pub fn cmpr_bitmap(
    canvas: &CanvasAttr,
    pixels: &[u8],
    width: u32,
    height: u32,
    out: &mut [u8],
) -> Result<usize> {
    let config = CanvasAttr { width, height, ..*canvas }.codec_config();
    config.validate()?;
    let frame_bytes = config.frame_bytes();
    if pixels.len() < frame_bytes {
        return Err(OsdcError::BufferTooSmall {
            required: frame_bytes,
            actual: pixels.len(),
        });
    }
    let mut scratch = pixels[..frame_bytes].to_vec();
    encode_frame_into(&mut scratch, &config, out)
}

fn rasterize<S: RowSink>(
    canvas: &CanvasAttr,
    objects: &[DrawObject],
    sink: &mut S,
) -> Result<()> {
    let sources = bitmap_sources(canvas, objects)?;
    let background = canvas.background();
    let pel = canvas.format.storage_bytes();

    let mut slicer = RowSlicer::new(objects, canvas.width);
    for y in 0..canvas.height as i32 {
        for slice in slicer.row(y) {
            let Some(id) = slice.owner else {
                sink.solid(background, slice.len())?;
                continue;
            };

            let object = &objects[id];
            match (object.bitmap_attr(), sources[id].as_deref()) {
                (Some(bitmap), Some(data)) => {
                    // the slice lies inside the bitmap, so both are in range
                    let row = (i64::from(y) - i64::from(bitmap.rect.y)) as usize;
                    let col = (i64::from(slice.x0) - i64::from(bitmap.rect.x)) as usize;
                    let offset = row * bitmap.stride + col * pel;
                    sink.pixels(&data[offset..offset + slice.len() * pel])?;
                }
                _ => sink.solid(object.color().unwrap_or(background), slice.len())?,
            }
        }
    }
    Ok(())
}

/// Raw pixels of every bitmap object, decompressing where needed.
fn bitmap_sources<'a>(
    canvas: &CanvasAttr,
    objects: &[DrawObject<'a>],
) -> Result<Vec<Option<Cow<'a, [u8]>>>> {
    let pel = canvas.format.storage_bytes();

    objects
        .iter()
        .map(|object| match *object {
            DrawObject::Bitmap { bitmap, data } => {
                let rect = bitmap.rect;
                if rect.width == 0 || rect.height == 0 {
                    return Ok(None);
                }
                let required = bitmap
                    .stride
                    .checked_mul(rect.height as usize - 1)
                    .zip((rect.width as usize).checked_mul(pel))
                    .and_then(|(rows, last)| rows.checked_add(last))
                    .ok_or(OsdcError::InvalidDimensions {
                        width: rect.width as u32,
                        height: rect.height as u32,
                    })?;
                if data.len() < required {
                    return Err(OsdcError::BufferTooSmall {
                        required,
                        actual: data.len(),
                    });
                }
                Ok(Some(Cow::Borrowed(data)))
            }
            DrawObject::CmprBitmap { bitmap, data } => {
                let rect = bitmap.rect;
                if rect.width == 0 || rect.height == 0 {
                    return Ok(None);
                }
                let header = StreamHeader::parse(data)?;
                if header.format != canvas.format {
                    return Err(OsdcError::UnsupportedFormat(header.format as u8));
                }
                if header.width != rect.width as u32 || header.height != rect.height as u32 {
                    return Err(OsdcError::InvalidDimensions {
                        width: header.width,
                        height: header.height,
                    });
                }
                let (_, decoded) = decode_frame_to_vec(data, DEFAULT_RUN_LEN_BITS)?;
                Ok(Some(Cow::Owned(decoded)))
            }
            _ => Ok(None),
        })
        .collect()
}
