//! Per-row overlap resolution.
//!
//! Each row starts as one background slice covering the full width. Objects
//! are painted over it in list order, splitting whatever they overlap, so the
//! result is a sorted, gap-free partition of the row.

use super::DrawObject;

/// A run of pixels `[x0, x1)` owned by one object, or by the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub x0: i32,
    pub x1: i32,
    /// Index into the object list, `None` for background.
    pub owner: Option<usize>,
}

impl Slice {
    #[inline]
    pub fn len(&self) -> usize {
        (self.x1 - self.x0) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0
    }
}

/// Row-by-row slicer reusing its buffers between rows.
pub struct RowSlicer<'o, 'a> {
    objects: &'o [DrawObject<'a>],
    width: i32,
    slices: Vec<Slice>,
    scratch: Vec<Slice>,
    ranges: Vec<(i64, i64)>,
}

impl<'o, 'a> RowSlicer<'o, 'a> {
    pub fn new(objects: &'o [DrawObject<'a>], width: u32) -> Self {
        Self {
            objects,
            width: width.min(i32::MAX as u32) as i32,
            slices: Vec::with_capacity(objects.len() * 2 + 1),
            scratch: Vec::with_capacity(objects.len() * 2 + 1),
            ranges: Vec::with_capacity(2),
        }
    }

    /// Visible slices of row `y`, left to right.
    pub fn row(&mut self, y: i32) -> &[Slice] {
        self.slices.clear();
        self.slices.push(Slice {
            x0: 0,
            x1: self.width,
            owner: None,
        });

        let objects = self.objects;
        for (id, object) in objects.iter().enumerate() {
            self.ranges.clear();
            object.row_ranges(i64::from(y), &mut self.ranges);

            let width = i64::from(self.width);
            for i in 0..self.ranges.len() {
                let (x0, x1) = self.ranges[i];
                // both ends land in [0, width] so the casts are lossless
                let slice = Slice {
                    x0: x0.clamp(0, width) as i32,
                    x1: x1.clamp(0, width) as i32,
                    owner: Some(id),
                };
                if !slice.is_empty() {
                    paint(&mut self.slices, &mut self.scratch, slice);
                }
            }
        }
        &self.slices
    }
}

/// Lay `top` over a sorted partition, splitting the slices it overlaps.
fn paint(slices: &mut Vec<Slice>, scratch: &mut Vec<Slice>, top: Slice) {
    scratch.clear();
    let mut placed = false;

    for &s in slices.iter() {
        if s.x1 <= top.x0 {
            scratch.push(s);
            continue;
        }
        if s.x0 >= top.x1 {
            if !placed {
                scratch.push(top);
                placed = true;
            }
            scratch.push(s);
            continue;
        }

        if s.x0 < top.x0 {
            scratch.push(Slice { x1: top.x0, ..s });
        }
        if !placed {
            scratch.push(top);
            placed = true;
        }
        if s.x1 > top.x1 {
            scratch.push(Slice { x0: top.x1, ..s });
        }
    }
    if !placed {
        scratch.push(top);
    }
    std::mem::swap(slices, scratch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasAttr;
    use crate::cmpr::PixelFormat;

    fn bg(x0: i32, x1: i32) -> Slice {
        Slice { x0, x1, owner: None }
    }

    fn obj(x0: i32, x1: i32, id: usize) -> Slice {
        Slice { x0, x1, owner: Some(id) }
    }

    #[test]
    fn test_empty_row_is_background() {
        let mut slicer = RowSlicer::new(&[], 16);
        assert_eq!(slicer.row(0), &[bg(0, 16)]);
    }

    #[test]
    fn test_later_objects_win() {
        let canvas = CanvasAttr::new(16, 4, PixelFormat::Lut8, 0);
        let objects = [
            DrawObject::rect(&canvas, 1, 2, 0, 8, 4, true, 1),
            DrawObject::rect(&canvas, 2, 6, 1, 8, 2, true, 1),
        ];
        let mut slicer = RowSlicer::new(&objects, 16);

        assert_eq!(slicer.row(0), &[bg(0, 2), obj(2, 10, 0), bg(10, 16)]);
        assert_eq!(slicer.row(1), &[bg(0, 2), obj(2, 6, 0), obj(6, 14, 1), bg(14, 16)]);
        assert_eq!(slicer.row(4), &[bg(0, 16)]);
    }

    #[test]
    fn test_object_inside_object() {
        let canvas = CanvasAttr::new(16, 4, PixelFormat::Lut8, 0);
        let objects = [
            DrawObject::rect(&canvas, 1, 0, 0, 16, 4, true, 1),
            DrawObject::rect(&canvas, 2, 4, 0, 4, 4, true, 1),
        ];
        let mut slicer = RowSlicer::new(&objects, 16);
        assert_eq!(slicer.row(2), &[obj(0, 4, 0), obj(4, 8, 1), obj(8, 16, 0)]);
    }

    #[test]
    fn test_clipped_to_canvas() {
        let canvas = CanvasAttr::new(8, 8, PixelFormat::Lut8, 0);
        let objects = [
            DrawObject::rect(&canvas, 1, -4, -4, 6, 6, true, 1),
            DrawObject::rect(&canvas, 1, 6, 0, 10, 2, true, 1),
            DrawObject::rect(&canvas, 1, 20, 0, 4, 4, true, 1),
        ];
        let mut slicer = RowSlicer::new(&objects, 8);
        assert_eq!(slicer.row(1), &[obj(0, 2, 0), bg(2, 6), obj(6, 8, 1)]);
        assert_eq!(slicer.row(3), &[bg(0, 8)]);
    }

    #[test]
    fn test_far_objects_clip_without_wrapping() {
        let canvas = CanvasAttr::new(8, 4, PixelFormat::Lut8, 0);
        let objects = [
            DrawObject::rect(&canvas, 1, i32::MAX - 2, 0, 10, 4, true, 1),
            DrawObject::rect(&canvas, 2, i32::MIN, 1, i32::MAX, 1, true, 1),
            DrawObject::rect(&canvas, 3, -4, 2, i32::MAX, 1, true, 1),
        ];
        let mut slicer = RowSlicer::new(&objects, 8);
        assert_eq!(slicer.row(0), &[bg(0, 8)]);
        assert_eq!(slicer.row(1), &[bg(0, 8)]);
        assert_eq!(slicer.row(2), &[obj(0, 8, 2)]);
    }

    #[test]
    fn test_slices_partition_row() {
        let canvas = CanvasAttr::new(40, 40, PixelFormat::Lut8, 0);
        let objects = [
            DrawObject::line(&canvas, 1, 0, 0, 39, 39, 3),
            DrawObject::rect(&canvas, 2, 5, 5, 20, 20, false, 2),
            DrawObject::line(&canvas, 3, 39, 0, 0, 39, 1),
        ];
        let mut slicer = RowSlicer::new(&objects, 40);
        for y in 0..40 {
            let slices = slicer.row(y);
            assert_eq!(slices.first().map(|s| s.x0), Some(0));
            assert_eq!(slices.last().map(|s| s.x1), Some(40));
            for pair in slices.windows(2) {
                assert_eq!(pair[0].x1, pair[1].x0);
            }
            assert!(slices.iter().all(|s| !s.is_empty()));
        }
    }
}
