use std::fmt;

use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};

/// An sRGB color with 8 bits per channel and straight alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    pub const BLACK: Self = Self::from_rgb8(0, 0, 0);
    pub const WHITE: Self = Self::from_rgb8(255, 255, 255);
    pub const RED: Self = Self::from_rgb8(255, 0, 0);
    pub const GREEN: Self = Self::from_rgb8(0, 255, 0);
    pub const BLUE: Self = Self::from_rgb8(0, 0, 255);
    /// The default landmark and frame rate color.
    pub const MAGENTA: Self = Self::from_rgb8(255, 0, 255);

    /// Creates an opaque color.
    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    #[inline]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Returns the channel values to store for this color in an image laid out as `order`.
    pub fn in_order(self, order: ChannelOrder) -> Color {
        let [r, g, b, a] = self.0;
        match order {
            ChannelOrder::Rgb => self,
            ChannelOrder::Bgr => Self([b, g, r, a]),
        }
    }

    /// Packs red, green and blue into the low 24 bits of a `u32`, the framebuffer format of
    /// `minifb` windows. Alpha is dropped.
    #[inline]
    pub fn to_0rgb(self) -> u32 {
        let [r, g, b, _] = self.0;
        u32::from_be_bytes([0, r, g, b])
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

// Lets `embedded-graphics` draw with `Color` directly.
impl PixelColor for Color {
    type Raw = RawU32;
}

/// Memory order of the color channels of an [`Image`][crate::Image]. Alpha always comes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// What the JPEG decoders produce and hand landmark networks consume.
    #[default]
    Rgb,
    /// Common for raw capture APIs.
    Bgr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order() {
        let c = Color::from_rgba8(1, 2, 3, 4);
        assert_eq!(c.in_order(ChannelOrder::Rgb), c);
        assert_eq!(c.in_order(ChannelOrder::Bgr), Color::from_rgba8(3, 2, 1, 4));
        assert_eq!(c.in_order(ChannelOrder::Bgr).in_order(ChannelOrder::Bgr), c);
    }

    #[test]
    fn pack_0rgb() {
        assert_eq!(Color::RED.to_0rgb(), 0x00ff0000);
        assert_eq!(Color::from_rgba8(0x12, 0x34, 0x56, 0x00).to_0rgb(), 0x00123456);
        assert_eq!(format!("{:?}", Color::MAGENTA), "#ff00ffff");
    }
}
