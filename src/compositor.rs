//! High-level compositor exposed to JavaScript.
//!
//! Collects draw objects for one canvas, sizes the output buffer and falls
//! back to a background-only stream when the objects do not fit.

use js_sys::Uint8Array;
use log::{info, warn};
use wasm_bindgen::prelude::*;

use crate::canvas::{
    draw_canvas, draw_cmpr_canvas, estimate_canvas_size, Canvas, CanvasAttr, DrawObject, Point,
    RectAttr,
};
use crate::cmpr::{decode_frame_to_vec, PixelFormat, DEFAULT_RUN_LEN_BITS};
use crate::error::OsdcError;

/// Owned description of a draw object.
enum PendingObject {
    Rect {
        color: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        filled: bool,
        thickness: i32,
    },
    Rects {
        color: u32,
        rects: Vec<RectAttr>,
        filled: bool,
    },
    Line {
        color: u32,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: i32,
    },
    Polygon {
        color: u32,
        points: Vec<Point>,
        thickness: i32,
    },
    Bitmap {
        data: Vec<u8>,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        compressed: bool,
    },
}

impl PendingObject {
    fn push_objects<'a>(&'a self, canvas: &CanvasAttr, out: &mut Vec<DrawObject<'a>>) {
        match *self {
            PendingObject::Rect {
                color,
                x,
                y,
                width,
                height,
                filled,
                thickness,
            } => out.push(DrawObject::rect(
                canvas, color, x, y, width, height, filled, thickness,
            )),
            PendingObject::Rects {
                color,
                ref rects,
                filled,
            } => out.extend(DrawObject::rects(canvas, color, rects, filled)),
            PendingObject::Line {
                color,
                x0,
                y0,
                x1,
                y1,
                thickness,
            } => out.push(DrawObject::line(canvas, color, x0, y0, x1, y1, thickness)),
            PendingObject::Polygon {
                color,
                ref points,
                thickness,
            } => out.extend(DrawObject::polygon(canvas, color, points, thickness)),
            PendingObject::Bitmap {
                ref data,
                x,
                y,
                width,
                height,
                compressed,
            } => out.push(DrawObject::bitmap(canvas, data, x, y, width, height, compressed)),
        }
    }
}

/// OSD canvas compositor producing compressed bitstreams.
#[wasm_bindgen]
pub struct OsdCompositor {
    canvas: CanvasAttr,
    objects: Vec<PendingObject>,
    bitstream: Vec<u8>,
    fell_back: bool,
}

#[wasm_bindgen]
impl OsdCompositor {
    /// Create a compositor. `format` is the header format code
    /// (0 = ARGB8888, 4 = ARGB4444, 5 = ARGB1555, 8 = LUT8, 10 = LUT4).
    /// Returns null for an unknown format or an invalid size.
    #[wasm_bindgen]
    pub fn create(width: u32, height: u32, format: u8, bg_color: u32) -> Option<OsdCompositor> {
        let Ok(format) = PixelFormat::try_from(format) else {
            warn!("unsupported pixel format code {format}");
            return None;
        };
        Self::with_canvas(CanvasAttr::new(width, height, format, bg_color))
    }

    /// Create a compositor from a JSON canvas description, e.g.
    /// `{"width": 720, "height": 576, "format": "Argb1555", "bg_color_code": 0}`.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(json: &str) -> Option<OsdCompositor> {
        match serde_json::from_str::<CanvasAttr>(json) {
            Ok(canvas) => Self::with_canvas(canvas),
            Err(err) => {
                warn!("{}", OsdcError::from(err));
                None
            }
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.canvas.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.canvas.height
    }

    /// Header format code of the canvas.
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> u8 {
        self.canvas.format as u8
    }

    #[wasm_bindgen(getter, js_name = objectCount)]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Add a rectangle. Colors are in the canvas format's native layout.
    #[allow(clippy::too_many_arguments)]
    #[wasm_bindgen(js_name = addRect)]
    pub fn add_rect(
        &mut self,
        color: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        filled: bool,
        thickness: i32,
    ) -> usize {
        self.push(PendingObject::Rect {
            color,
            x,
            y,
            width,
            height,
            filled,
            thickness,
        })
    }

    /// Add several rectangles sharing a color. `rects` holds x, y, width,
    /// height, thickness quintuples; a trailing partial group is ignored.
    #[wasm_bindgen(js_name = addRects)]
    pub fn add_rects(&mut self, color: u32, rects: &[i32], filled: bool) -> usize {
        let rects = rects
            .chunks_exact(5)
            .map(|r| RectAttr {
                x: r[0],
                y: r[1],
                width: r[2],
                height: r[3],
                thickness: r[4],
            })
            .collect();
        self.push(PendingObject::Rects {
            color,
            rects,
            filled,
        })
    }

    #[wasm_bindgen(js_name = addLine)]
    pub fn add_line(
        &mut self,
        color: u32,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: i32,
    ) -> usize {
        self.push(PendingObject::Line {
            color,
            x0,
            y0,
            x1,
            y1,
            thickness,
        })
    }

    /// Add a closed outline. `points` holds x, y pairs.
    #[wasm_bindgen(js_name = addPolygon)]
    pub fn add_polygon(&mut self, color: u32, points: &[i32], thickness: i32) -> usize {
        let points = points.chunks_exact(2).map(|p| Point { x: p[0], y: p[1] }).collect();
        self.push(PendingObject::Polygon {
            color,
            points,
            thickness,
        })
    }

    /// Add a bitmap in the canvas format. Compressed bitmaps must come from
    /// a stream with the same format and size.
    #[wasm_bindgen(js_name = addBitmap)]
    pub fn add_bitmap(
        &mut self,
        data: &[u8],
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        compressed: bool,
    ) -> usize {
        self.push(PendingObject::Bitmap {
            data: data.to_vec(),
            x,
            y,
            width,
            height,
            compressed,
        })
    }

    /// Remove all objects.
    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Bytes needed to draw the current objects.
    #[wasm_bindgen(js_name = estimateSize)]
    pub fn estimate_size(&self) -> usize {
        self.estimate(&self.draw_objects())
    }

    /// Draw into a buffer of `capacity` bytes (0 = estimated size) and keep
    /// the stream. Returns the stream length, 0 on failure.
    ///
    /// The capacity is raised to what a background-only canvas needs; when
    /// the objects do not fit, that canvas is drawn instead.
    #[wasm_bindgen]
    pub fn draw(&mut self, capacity: usize) -> usize {
        let floor = self.estimate(&[]);
        let capacity = if capacity == 0 {
            self.estimate_size()
        } else {
            capacity.max(floor)
        };
        let mut out = vec![0u8; capacity];

        let (written, fell_back) = {
            let objects = self.draw_objects();
            match draw_cmpr_canvas(&self.canvas, &objects, &mut out) {
                Ok(len) => (len, false),
                Err(OsdcError::InsufficientCapacity { required, capacity }) => {
                    warn!(
                        "{} objects need {} bytes but only {} are available, \
                         drawing background only",
                        objects.len(),
                        required,
                        capacity
                    );
                    match draw_cmpr_canvas(&self.canvas, &[], &mut out) {
                        Ok(len) => (len, true),
                        Err(err) => {
                            warn!("background-only draw failed: {err}");
                            (0, true)
                        }
                    }
                }
                Err(err) => {
                    warn!("draw failed: {err}");
                    (0, false)
                }
            }
        };

        out.truncate(written);
        self.bitstream = out;
        self.fell_back = fell_back;
        written
    }

    /// Whether the last draw dropped the objects.
    #[wasm_bindgen(getter, js_name = fellBack)]
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    #[wasm_bindgen(getter, js_name = bitstreamLength)]
    pub fn bitstream_length(&self) -> usize {
        self.bitstream.len()
    }

    /// Get the last drawn stream.
    #[wasm_bindgen(js_name = getBitstream)]
    pub fn get_bitstream(&self) -> Uint8Array {
        Uint8Array::from(&self.bitstream[..])
    }

    /// Paint the current objects into raw canvas pixels.
    #[wasm_bindgen]
    pub fn paint(&self) -> Option<Vec<u8>> {
        let mut pixels = vec![0u8; self.canvas.frame_bytes()];
        match draw_canvas(&self.canvas, &self.draw_objects(), &mut pixels) {
            Ok(()) => Some(pixels),
            Err(err) => {
                warn!("paint failed: {err}");
                None
            }
        }
    }

    /// Compress raw pixels in the canvas format, without any objects.
    #[wasm_bindgen(js_name = encodePixels)]
    pub fn encode_pixels(&self, pixels: &[u8]) -> Option<Vec<u8>> {
        match Canvas::from_pixels(self.canvas, pixels.to_vec()).and_then(|c| c.compress()) {
            Ok(stream) => Some(stream),
            Err(err) => {
                warn!("encode failed: {err}");
                None
            }
        }
    }

    /// Decompress a stream into raw pixels of the size its header declares.
    #[wasm_bindgen]
    pub fn decode(data: &[u8]) -> Option<Vec<u8>> {
        match decode_frame_to_vec(data, DEFAULT_RUN_LEN_BITS) {
            Ok((_, pixels)) => Some(pixels),
            Err(err) => {
                warn!("decode failed: {err}");
                None
            }
        }
    }
}

impl OsdCompositor {
    fn with_canvas(canvas: CanvasAttr) -> Option<Self> {
        if let Err(err) = canvas.validate() {
            warn!("invalid canvas: {err}");
            return None;
        }
        info!("{}x{} {:?} canvas", canvas.width, canvas.height, canvas.format);
        Some(Self {
            canvas,
            objects: Vec::new(),
            bitstream: Vec::new(),
            fell_back: false,
        })
    }

    fn estimate(&self, objects: &[DrawObject]) -> usize {
        match estimate_canvas_size(&self.canvas, objects) {
            Ok(size) => size,
            Err(err) => {
                warn!("estimate failed: {err}");
                0
            }
        }
    }

    fn push(&mut self, object: PendingObject) -> usize {
        self.objects.push(object);
        self.objects.len()
    }

    fn draw_objects(&self) -> Vec<DrawObject<'_>> {
        let mut out = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            object.push_objects(&self.canvas, &mut out);
        }
        out
    }

    /// Last drawn stream.
    pub fn bitstream(&self) -> &[u8] {
        &self.bitstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_bad_input() {
        assert!(OsdCompositor::create(8, 8, 3, 0).is_none());
        assert!(OsdCompositor::create(0, 8, 8, 0).is_none());
        assert!(OsdCompositor::from_json("{\"width\": 8}").is_none());
        assert!(OsdCompositor::from_json("not json").is_none());
    }

    #[test]
    fn test_draw_and_decode() {
        let mut osd = OsdCompositor::create(8, 8, 0, 0xFF00_0000).unwrap();
        assert_eq!(osd.add_rect(0xFF00_00FF, 0, 0, 4, 4, true, 1), 1);

        let len = osd.draw(0);
        assert!(len > 0 && len <= osd.estimate_size());
        assert!(!osd.fell_back());
        assert_eq!(osd.bitstream_length(), len);

        let decoded = OsdCompositor::decode(osd.bitstream()).unwrap();
        assert_eq!(Some(decoded), osd.paint());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"width": 16, "height": 4, "format": "Lut4", "bg_color_code": 2}"#;
        let osd = OsdCompositor::from_json(json).unwrap();
        assert_eq!((osd.width(), osd.height(), osd.format()), (16, 4, 10));
        assert_eq!(osd.paint(), Some(vec![2u8; 64]));
    }

    #[test]
    fn test_falls_back_to_background() {
        let mut osd = OsdCompositor::create(32, 32, 8, 0).unwrap();
        let noise: Vec<u8> = (0..32 * 32u32).map(|i| (i.wrapping_mul(97) % 251) as u8).collect();
        osd.add_bitmap(&noise, 0, 0, 32, 32, false);
        osd.add_line(5, 0, 0, 31, 31, 3);

        let len = osd.draw(1);
        assert!(osd.fell_back());
        assert!(len > 0);

        let decoded = OsdCompositor::decode(osd.bitstream()).unwrap();
        assert!(decoded.iter().all(|&p| p == 0));

        osd.clear();
        assert_eq!(osd.object_count(), 0);
        assert!(osd.draw(0) > 0);
        assert!(!osd.fell_back());
    }

    #[test]
    fn test_polygon_points() {
        let mut osd = OsdCompositor::create(64, 64, 8, 0).unwrap();
        osd.add_polygon(1, &[4, 4, 60, 4, 60, 60, 4, 60], 2);
        assert_eq!(osd.draw_objects().len(), 4);

        let pixels = osd.paint().unwrap();
        assert_eq!(pixels[4 * 64 + 30], 1);
        assert_eq!(pixels[30 * 64 + 30], 0);
    }

    #[test]
    fn test_add_rects() {
        let mut osd = OsdCompositor::create(16, 8, 8, 0).unwrap();
        assert_eq!(osd.add_rects(3, &[0, 0, 4, 2, 1, 8, 4, 8, 4, 1, 99], true), 1);
        assert_eq!(osd.draw_objects().len(), 2);

        let pixels = osd.paint().unwrap();
        assert_eq!(pixels[0], 3);
        assert_eq!(pixels[16 + 3], 3);
        assert_eq!(pixels[2 * 16], 0);
        assert_eq!(pixels[5 * 16 + 10], 3);
        assert_eq!(pixels[5 * 16 + 7], 0);

        let len = osd.draw(0);
        assert!(len > 0);
        assert_eq!(OsdCompositor::decode(osd.bitstream()), Some(pixels));
    }

    #[test]
    fn test_encode_pixels() {
        let osd = OsdCompositor::create(4, 2, 8, 0).unwrap();
        let pixels = [1u8, 1, 2, 2, 3, 3, 3, 1];
        let stream = osd.encode_pixels(&pixels).unwrap();
        assert_eq!(stream.len() % 16, 0);
        assert_eq!(OsdCompositor::decode(&stream), Some(pixels.to_vec()));

        assert_eq!(osd.encode_pixels(&pixels[..7]), None);
    }

    #[test]
    fn test_decode_rejects_oversized_header() {
        // ARGB8888, 8-entry palette, 65536 x 65536, then a single empty block
        let header: u64 = (8 << 15) | (0xFFFF << 31) | (0xFFFF << 47);
        let mut stream = header.to_le_bytes().to_vec();
        stream.resize(16, 0);
        assert_eq!(OsdCompositor::decode(&stream), None);
    }
}
