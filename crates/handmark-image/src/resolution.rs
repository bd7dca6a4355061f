use std::fmt;

use crate::Rect;

/// Size of a frame in pixels, printed as `WxH`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Full HD, `1920x1080`.
    pub const RES_1080P: Self = Self::new(1920, 1080);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns the reduced `width:height` ratio, or `None` for an empty resolution.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width, self.height)
    }

    /// Returns the smallest rectangle of aspect ratio `ratio` that covers the whole frame and
    /// shares its center.
    ///
    /// Nothing of the frame is cut off: the rectangle sticks out past two opposing edges instead.
    /// An empty resolution yields an empty rectangle at the origin.
    pub fn pad_to_aspect_ratio(&self, ratio: AspectRatio) -> Rect {
        let frame = Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32);
        if self.num_pixels() == 0 {
            return frame;
        }

        let padded = frame.grow_to_fit_aspect(ratio);
        log::trace!("{self} padded to {ratio}: {padded:?}");
        padded
    }
}

impl From<(u32, u32)> for Resolution {
    #[inline]
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A `width:height` ratio in lowest terms.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// `1:1`, the input shape of the hand landmark network.
    pub const SQUARE: Self = Self {
        width: 1,
        height: 1,
    };

    /// Reduces `width:height` to lowest terms. Returns `None` if either side is 0.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let d = gcd(width, height);
        Some(Self {
            width: width / d,
            height: height / d,
        })
    }

    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
