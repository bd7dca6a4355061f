//! Live hand landmark visualization.
//!
//! Frames are read from a [`FrameSource`][video::FrameSource], handed to a
//! [`HandDetector`][detector::HandDetector], annotated with the detected landmarks and the current
//! frame rate, and presented through a [`DisplaySink`][gui::DisplaySink]. [`session::Session`] ties
//! these together and is what the `handmark` binary runs.
//!
//! # Coordinates
//!
//! Detectors report landmark positions normalized to the frame: `(0, 0)` is the top left corner of
//! the frame and `(1, 1)` the bottom right one, with Y pointing *down*. [`mapping`] turns them into
//! integer pixel coordinates.
//!
//! # Environment Variables
//!
//! * `HANDMARK_JPEG_BACKEND`: selects the JPEG decoder used for webcam frames (see
//!   [`handmark_image`]).
//! * `HANDMARK_CAMERA` and `HANDMARK_MODEL`: defaults for the `--camera` and `--model` command line
//!   arguments.

use log::LevelFilter;

pub mod config;
pub mod detector;
pub mod frame;
pub mod gui;
pub mod landmark;
pub mod mapping;
pub mod nn;
pub mod overlay;
pub mod session;
pub mod timer;
pub mod video;

pub use handmark_image as image;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("handmark_image"), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Sets up `env_logger` for the invoking crate.
///
/// The invoking crate, `handmark` and `handmark_image` get *debug* output on *stderr*, `tract` only
/// warnings. Directives in `RUST_LOG` take precedence. Calling this a second time, or after some
/// other logger was installed, has no effect.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
