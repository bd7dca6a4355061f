//! Image handling for handmark.
//!
//! # Overview
//!
//! [`Image`] is an owned 8-bit image with 4 interleaved channels. The channels are usually red,
//! green, blue and alpha, but camera drivers and some detection backends disagree on whether red or
//! blue comes first; [`ChannelOrder`] names the two conventions, and [`Image::swap_red_blue`]
//! converts between them.
//!
//! A few primitive drawing operations are available in the [`draw`] module. They are meant for
//! quickly visualizing landmarks and are not meant to be exhaustive.
//!
//! # Environment Variables
//!
//! * `HANDMARK_JPEG_BACKEND`: Configures the JPEG image decoder to use. Allowed values are:
//!   * `zune-jpeg` (the default): uses the [zune-jpeg] crate.
//!   * `jpeg-decoder`: uses the [jpeg-decoder] crate.
//!
//! [zune-jpeg]: https://github.com/etemesi254/zune-jpeg
//! [jpeg-decoder]: https://github.com/image-rs/jpeg-decoder/

pub mod draw;
pub mod rect;

mod color;
mod image;
mod jpeg;
mod resolution;


pub use color::{ChannelOrder, Color};
pub use self::image::Image;
pub use jpeg::JpegBackend;
pub use rect::Rect;
pub use resolution::{AspectRatio, Resolution};
