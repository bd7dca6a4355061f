//! Axis-aligned rectangles in pixel space.
//!
//! The hand landmark network looks at a rectangular region of interest of each frame; [`Rect`]
//! describes that region and maps network coordinates back into the frame.

use std::fmt;

use crate::AspectRatio;

/// An axis-aligned rectangle with non-negative size, stored as its center and size.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: [f32; 2],
    size: [f32; 2],
}

impl Rect {
    #[inline]
    pub fn from_center(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            center: [x, y],
            size: [width, height],
        }
    }

    #[inline]
    pub fn from_top_left(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_center(x + width / 2.0, y + height / 2.0, width, height)
    }

    /// Returns the smallest rectangle containing all of `points`, or `None` if there are none.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let [x, y] = points.next()?;
        let [x0, y0, x1, y1] = points.fold([x, y, x, y], |[x0, y0, x1, y1], [x, y]| {
            [x0.min(x), y0.min(y), x1.max(x), y1.max(y)]
        });
        Some(Self::from_top_left(x0, y0, x1 - x0, y1 - y0))
    }

    /// Adds a margin of `amount` times the width (height) to the left and right (top and bottom).
    #[must_use]
    pub fn grow_rel(&self, amount: f32) -> Self {
        let scale = 1.0 + 2.0 * amount;
        Self {
            center: self.center,
            size: self.size.map(|s| s * scale),
        }
    }

    /// Widens or heightens the rectangle around its center until it has the aspect ratio `ratio`.
    ///
    /// The rectangle never shrinks.
    #[must_use]
    pub fn grow_to_fit_aspect(&self, ratio: AspectRatio) -> Self {
        let [w, h] = self.size;
        let ratio = ratio.as_f32();
        let size = if h * ratio >= w {
            [h * ratio, h]
        } else {
            [w, w / ratio]
        };
        Self {
            center: self.center,
            size,
        }
    }

    /// Left edge.
    #[inline]
    pub fn x(&self) -> f32 {
        self.center[0] - self.size[0] / 2.0
    }

    /// Top edge.
    #[inline]
    pub fn y(&self) -> f32 {
        self.center[1] - self.size[1] / 2.0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size[0]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size[0] * self.size[1]
    }

    #[inline]
    pub fn center(&self) -> [f32; 2] {
        self.center
    }

    /// Returns the overlapping part of `self` and `other`, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x().max(other.x());
        let y0 = self.y().max(other.y());
        let x1 = (self.x() + self.width()).min(other.x() + other.width());
        let y1 = (self.y() + self.height()).min(other.y() + other.height());
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some(Self::from_top_left(x0, y0, x1 - x0, y1 - y0))
    }

    /// Intersection over union of `self` and `other`, between 0.0 (disjoint) and 1.0 (equal).
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection(other).map_or(0.0, |rect| rect.area());
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }

    /// Maps `[u, v]`, where `[0, 0]` is the top left and `[1, 1]` the bottom right corner of this
    /// rectangle, to absolute coordinates.
    #[inline]
    pub fn denormalize(&self, [u, v]: [f32; 2]) -> [f32; 2] {
        [self.x() + u * self.width(), self.y() + v * self.height()]
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect({},{} {}x{})",
            self.x(),
            self.y(),
            self.width(),
            self.height()
        )
    }
}
