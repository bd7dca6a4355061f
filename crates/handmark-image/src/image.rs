use std::fmt;

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::{jpeg, ChannelOrder, Color, Resolution};

/// An owned frame buffer with 4 interleaved 8-bit channels.
///
/// Pixel accessors treat the channels as red, green, blue and alpha. Whether the image really
/// stores red first is up to whoever owns it; [`Image::to_order`] and [`Image::to_0rgb`] take the
/// actual [`ChannelOrder`] as an argument.
#[derive(Clone, PartialEq)]
pub struct Image {
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Decodes a JFIF JPEG or Motion JPEG frame with the backend selected by
    /// `HANDMARK_JPEG_BACKEND`.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        jpeg::decode_jpeg(data)
    }

    /// Creates a `width x height` image with every channel of every pixel set to 0.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an image of size `res` with every pixel set to `color`.
    pub fn filled(res: impl Into<Resolution>, color: Color) -> Self {
        let res = res.into();
        Self {
            buf: ImageBuffer::from_pixel(res.width(), res.height(), Rgba(color.0)),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Returns the pixel at `(x, y)`, or `None` if that is outside of the image.
    pub fn get_checked(&self, x: i64, y: i64) -> Option<Color> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width())?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height())?;
        Some(self.get(x, y))
    }

    /// Overwrites the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside of the image.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    pub fn clear(&mut self, color: Color) {
        for pix in self.buf.pixels_mut() {
            pix.0 = color.0;
        }
    }

    /// Exchanges the first and third channel of every pixel, turning RGB data into BGR and vice
    /// versa.
    pub fn swap_red_blue(&mut self) {
        for pix in self.buf.pixels_mut() {
            pix.0.swap(0, 2);
        }
    }

    /// Returns a copy of this image with its channels rearranged from `from` to `to`.
    pub fn to_order(&self, from: ChannelOrder, to: ChannelOrder) -> Image {
        let mut copy = self.clone();
        if from != to {
            copy.swap_red_blue();
        }
        copy
    }

    /// Raw interleaved channel data, row by row.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }

    /// Converts the image to a `0RGB` framebuffer, reading the stored channels as `order`.
    pub fn to_0rgb(&self, order: ChannelOrder) -> Vec<u32> {
        self.buf
            .pixels()
            .map(|pix| Color(pix.0).in_order(order).to_0rgb())
            .collect()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({})", self.resolution())
    }
}
