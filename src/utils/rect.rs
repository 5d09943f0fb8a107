use std::cmp;

use cgmath::Point2;
use serde::{Deserialize, Serialize};

/// A rectangle, with top-left corner at `min`, and bottom-right corner at `max`.
/// `max` is exclusive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point2<i32>,
    pub max: Point2<i32>,
}

impl Rect {
    #[inline]
    pub fn new(min: Point2<i32>, max: Point2<i32>) -> Self {
        Rect { min, max }
    }

    /// Shortcut of `Rect::new` with raw corner coordinates.
    #[inline]
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Rect::new(Point2::new(x0, y0), Point2::new(x1, y1))
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.max.x.saturating_sub(self.min.x)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// Returns false if the extents of the rectangle do not fit in an `i32`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.max.x.checked_sub(self.min.x).is_some()
            && self.max.y.checked_sub(self.min.y).is_some()
    }

    /// Returns true if the rectangle covers no pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    #[inline]
    pub fn overlap(&self, rhs: Self) -> Self {
        Rect {
            min: Point2::new(cmp::max(self.min.x, rhs.min.x), cmp::max(self.min.y, rhs.min.y)),
            max: Point2::new(cmp::min(self.max.x, rhs.max.x), cmp::min(self.max.y, rhs.max.y)),
        }
    }

    #[inline]
    pub fn contains<P>(&self, p: P) -> bool
    where
        P: Into<Point2<i32>>,
    {
        let p = p.into();
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}
