use std::borrow::Cow;

use crate::image::{ChannelOrder, Image, Resolution};

/// A captured video frame.
///
/// Pairs the pixel data with the channel order it is stored in, since capture backends and
/// detectors disagree on whether red or blue comes first.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: Image,
    order: ChannelOrder,
}

impl Frame {
    pub fn new(image: Image, order: ChannelOrder) -> Self {
        Self { image, order }
    }

    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    #[inline]
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    /// Returns the order in which the color channels of the image are stored.
    #[inline]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    /// Returns the frame's pixels in channel order `target`.
    ///
    /// Borrows the frame's image when it is already stored in `target` order, and returns a
    /// converted copy otherwise. The frame itself is left untouched.
    pub fn to_order(&self, target: ChannelOrder) -> Cow<'_, Image> {
        if self.order == target {
            Cow::Borrowed(&self.image)
        } else {
            Cow::Owned(self.image.to_order(self.order, target))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::image::Color;

    use super::*;

    #[test]
    fn to_order() {
        let mut image = Image::new(1, 1);
        image.set(0, 0, Color::from_rgb8(1, 2, 3));
        let frame = Frame::new(image, ChannelOrder::Bgr);

        assert!(matches!(frame.to_order(ChannelOrder::Bgr), Cow::Borrowed(_)));

        let rgb = frame.to_order(ChannelOrder::Rgb);
        assert!(matches!(rgb, Cow::Owned(_)));
        assert_eq!(rgb.get(0, 0), Color::from_rgb8(3, 2, 1));
        assert_eq!(frame.image().get(0, 0), Color::from_rgb8(1, 2, 3));
    }
}
