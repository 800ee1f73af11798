//! Draw objects and their precomputed scanline geometry.
//!
//! Coordinates come straight from callers and may sit anywhere in `i32`.
//! Row and column arithmetic is done in `i64` and only clipped to the canvas
//! afterwards.

use serde::{Deserialize, Serialize};

use super::CanvasAttr;
use crate::cmpr::Color;
use crate::utils::clamp;

pub const MIN_THICKNESS: i32 = 1;
pub const MAX_THICKNESS: i32 = 32;

/// Polygon edge snapping gives up after this many passes.
const SNAP_PASSES: usize = 5;

/// Axis-aligned rectangle with an optional stroke thickness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectAttr {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub thickness: i32,
}

impl RectAttr {
    /// One past the last column.
    #[inline]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// One past the last row.
    #[inline]
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One edge of a thick line's outline, stored top to bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LineEdge {
    y_top: f32,
    y_bottom: f32,
    x_top: f32,
    /// Inverse slope: x step per scanline
    dx_dy: f32,
}

impl LineEdge {
    fn new(p: (f32, f32), q: (f32, f32)) -> Self {
        let (top, bottom) = if p.1 <= q.1 { (p, q) } else { (q, p) };
        let dy = bottom.1 - top.1;
        Self {
            y_top: top.1,
            y_bottom: bottom.1,
            x_top: top.0,
            dx_dy: if dy > 0.0 { (bottom.0 - top.0) / dy } else { 0.0 },
        }
    }

    /// Crossing with scanline `y`, half-open at the bottom.
    #[inline]
    fn cross(&self, y: f32) -> Option<f32> {
        if self.y_top <= y && y < self.y_bottom {
            Some(self.x_top + (y - self.y_top) * self.dx_dy)
        } else {
            None
        }
    }
}

/// A segment widened to `thickness` with half-pixel caps.
///
/// Pixel centers sit on integer coordinates. The outline is a convex
/// quadrilateral, so every scanline crosses it in a single x-range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAttr {
    edges: [LineEdge; 4],
    min_y: i64,
    max_y: i64,
}

impl LineAttr {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32, thickness: i32) -> Self {
        let thickness = clamp(thickness, MIN_THICKNESS, MAX_THICKNESS);
        let (fx0, fy0, fx1, fy1) = (x0 as f32, y0 as f32, x1 as f32, y1 as f32);
        let (dx, dy) = (fx1 - fx0, fy1 - fy0);
        let len = dx.hypot(dy);
        let (ux, uy) = if len > 0.0 { (dx / len, dy / len) } else { (1.0, 0.0) };

        let half = thickness as f32 / 2.0;
        let (nx, ny) = (-uy * half, ux * half);
        let (cx, cy) = (ux * 0.5, uy * 0.5);

        let a = (fx0 - cx + nx, fy0 - cy + ny);
        let b = (fx0 - cx - nx, fy0 - cy - ny);
        let c = (fx1 + cx + nx, fy1 + cy + ny);
        let d = (fx1 + cx - nx, fy1 + cy - ny);

        let ys = [a.1, b.1, c.1, d.1];
        let top = ys.iter().copied().fold(f32::MAX, f32::min);
        let bottom = ys.iter().copied().fold(f32::MIN, f32::max);

        Self {
            edges: [
                LineEdge::new(a, c),
                LineEdge::new(c, d),
                LineEdge::new(d, b),
                LineEdge::new(b, a),
            ],
            // float to int casts saturate
            min_y: top.ceil() as i64,
            max_y: bottom.ceil() as i64 - 1,
        }
    }

    /// First and last row touched, inclusive.
    #[inline]
    pub fn rows(&self) -> (i64, i64) {
        (self.min_y, self.max_y)
    }

    /// Pixels `[x0, x1)` covered on row `y`.
    pub fn span(&self, y: i64) -> Option<(i64, i64)> {
        if y < self.min_y || y > self.max_y {
            return None;
        }
        let yf = y as f32;
        let (lo, hi) = self
            .edges
            .iter()
            .filter_map(|edge| edge.cross(yf))
            .fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));

        let (x0, x1) = (lo.ceil() as i64, hi.ceil() as i64);
        (lo <= hi && x0 < x1).then_some((x0, x1))
    }
}

/// Bitmap placement. `stride` is the row pitch of the raw pixels in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitmapAttr {
    pub rect: RectAttr,
    pub stride: usize,
}

/// Something to draw on a canvas. Objects later in a list are drawn on top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawObject<'a> {
    Rect { rect: RectAttr, color: Color },
    StrokeRect { rect: RectAttr, color: Color },
    Line { line: LineAttr, color: Color },
    /// Raw pixels in the canvas format
    Bitmap { bitmap: BitmapAttr, data: &'a [u8] },
    /// A stream produced by [`cmpr_bitmap`](super::cmpr_bitmap)
    CmprBitmap { bitmap: BitmapAttr, data: &'a [u8] },
}

impl<'a> DrawObject<'a> {
    /// Filled or stroked rectangle. `color_code` is in the canvas format.
    #[allow(clippy::too_many_arguments)]
    pub fn rect(
        canvas: &CanvasAttr,
        color_code: u32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        filled: bool,
        thickness: i32,
    ) -> Self {
        let rect = RectAttr {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
            thickness: clamp(thickness, MIN_THICKNESS, MAX_THICKNESS),
        };
        let color = canvas.format.unpack(color_code);
        if filled {
            DrawObject::Rect { rect, color }
        } else {
            DrawObject::StrokeRect { rect, color }
        }
    }

    /// Several rectangles sharing one color and fill mode.
    pub fn rects(
        canvas: &CanvasAttr,
        color_code: u32,
        rects: &[RectAttr],
        filled: bool,
    ) -> Vec<Self> {
        rects
            .iter()
            .map(|r| {
                Self::rect(canvas, color_code, r.x, r.y, r.width, r.height, filled, r.thickness)
            })
            .collect()
    }

    /// Thick line segment from `(x0, y0)` to `(x1, y1)`, both ends included.
    pub fn line(
        canvas: &CanvasAttr,
        color_code: u32,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        thickness: i32,
    ) -> Self {
        DrawObject::Line {
            line: LineAttr::new(x0, y0, x1, y1, thickness),
            color: canvas.format.unpack(color_code),
        }
    }

    /// Closed outline through `points`. Edges that are within `thickness` of
    /// horizontal or vertical are snapped straight first.
    pub fn polygon(
        canvas: &CanvasAttr,
        color_code: u32,
        points: &[Point],
        thickness: i32,
    ) -> Vec<Self> {
        let thickness = clamp(thickness, MIN_THICKNESS, MAX_THICKNESS);
        let pts = snap_polygon(points, thickness);
        let n = pts.len();
        (0..n)
            .map(|i| {
                let (p, q) = (pts[i], pts[(i + 1) % n]);
                Self::line(canvas, color_code, p.x, p.y, q.x, q.y, thickness)
            })
            .collect()
    }

    /// Bitmap in the canvas format, raw or compressed.
    pub fn bitmap(
        canvas: &CanvasAttr,
        data: &'a [u8],
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        compressed: bool,
    ) -> Self {
        let width = width.max(0);
        let bitmap = BitmapAttr {
            rect: RectAttr {
                x,
                y,
                width,
                height: height.max(0),
                thickness: 0,
            },
            stride: (width as usize).saturating_mul(canvas.format.storage_bytes()),
        };
        if compressed {
            DrawObject::CmprBitmap { bitmap, data }
        } else {
            DrawObject::Bitmap { bitmap, data }
        }
    }

    /// First and last row touched, inclusive.
    pub fn rows(&self) -> (i64, i64) {
        match self {
            DrawObject::Rect { rect, .. } | DrawObject::StrokeRect { rect, .. } => {
                (i64::from(rect.y), rect.bottom() - 1)
            }
            DrawObject::Bitmap { bitmap, .. } | DrawObject::CmprBitmap { bitmap, .. } => {
                (i64::from(bitmap.rect.y), bitmap.rect.bottom() - 1)
            }
            DrawObject::Line { line, .. } => line.rows(),
        }
    }

    /// Solid color, `None` for bitmaps.
    pub fn color(&self) -> Option<Color> {
        match *self {
            DrawObject::Rect { color, .. }
            | DrawObject::StrokeRect { color, .. }
            | DrawObject::Line { color, .. } => Some(color),
            DrawObject::Bitmap { .. } | DrawObject::CmprBitmap { .. } => None,
        }
    }

    pub fn bitmap_attr(&self) -> Option<&BitmapAttr> {
        match self {
            DrawObject::Bitmap { bitmap, .. } | DrawObject::CmprBitmap { bitmap, .. } => {
                Some(bitmap)
            }
            _ => None,
        }
    }

    /// Push the x-ranges `[x0, x1)` covered on row `y`, unclipped.
    pub(crate) fn row_ranges(&self, y: i64, out: &mut Vec<(i64, i64)>) {
        let (top, bottom) = self.rows();
        if y < top || y > bottom {
            return;
        }
        match self {
            DrawObject::Rect { rect, .. } => out.push((i64::from(rect.x), rect.right())),
            DrawObject::StrokeRect { rect, .. } => {
                let (left, right) = (i64::from(rect.x), rect.right());
                let t = i64::from(rect.thickness);
                // side bars only between the top and bottom bands
                let inner = y >= top + t && y <= bottom - t;
                if inner && left + t < right - t {
                    out.push((left, left + t));
                    out.push((right - t, right));
                } else {
                    out.push((left, right));
                }
            }
            DrawObject::Line { line, .. } => out.extend(line.span(y)),
            DrawObject::Bitmap { bitmap, .. } | DrawObject::CmprBitmap { bitmap, .. } => {
                out.push((i64::from(bitmap.rect.x), bitmap.rect.right()))
            }
        }
    }
}

/// Straighten nearly axis-aligned polygon edges.
fn snap_polygon(points: &[Point], thickness: i32) -> Vec<Point> {
    let mut pts = points.to_vec();
    let n = pts.len();
    if n < 2 {
        return pts;
    }

    let t = i64::from(thickness);
    let dist = |a: i32, b: i32| (i64::from(a) - i64::from(b)).abs();

    for _ in 0..SNAP_PASSES {
        for i in 0..n - 1 {
            if dist(pts[i].y, pts[i + 1].y) < t {
                pts[i + 1].y = pts[i].y;
            }
            if dist(pts[i].x, pts[i + 1].x) < t {
                pts[i + 1].x = pts[i].x;
            }
        }
        // closing edge
        if dist(pts[n - 1].y, pts[0].y) < t {
            pts[0].y = pts[n - 1].y;
        }
        if dist(pts[n - 1].x, pts[0].x) < t {
            pts[0].x = pts[n - 1].x;
        }

        let dx = dist(pts[1].x, pts[0].x);
        let dy = dist(pts[1].y, pts[0].y);
        if (dx > t || dx == 0) && (dy > t || dy == 0) {
            break;
        }
    }
    pts
}
