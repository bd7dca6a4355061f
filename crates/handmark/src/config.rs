//! Command line configuration of the `handmark` binary.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::detector::HandsOptions;
use crate::image::Resolution;
use crate::overlay::OverlayStyle;
use crate::session::{Report, RetryPolicy};
use crate::video::webcam::{ParamPreference, WebcamOptions};

/// Which capture parameter to keep when the camera cannot deliver both.
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum Prefer {
    Resolution,
    Framerate,
}

/// Shows webcam frames with the landmarks of detected hands drawn on top.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Index of the capture device (`/dev/video<N>`).
    #[arg(short, long, env = "HANDMARK_CAMERA", default_value_t = 0)]
    pub camera: u32,

    /// Desired frame width; requires `--height`.
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Desired frame height; requires `--width`.
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Desired frame rate.
    #[arg(long)]
    pub fps: Option<u32>,

    #[arg(long, value_enum, default_value = "resolution")]
    pub prefer: Prefer,

    /// Hand landmark network (ONNX).
    #[arg(short, long, env = "HANDMARK_MODEL")]
    pub model: PathBuf,

    /// Palm detection network (ONNX) used to find new hands. Without it, at most one hand is
    /// tracked.
    #[arg(long, env = "HANDMARK_PALM_MODEL")]
    pub palm_model: Option<PathBuf>,

    /// Search the whole frame every time instead of tracking hands across frames.
    #[arg(long)]
    pub static_image_mode: bool,

    #[arg(long, default_value_t = 2)]
    pub max_hands: usize,

    #[arg(long, default_value_t = 0.5)]
    pub detection_confidence: f32,

    #[arg(long, default_value_t = 0.5)]
    pub tracking_confidence: f32,

    /// Number of frame read failures in a row after which to give up.
    #[arg(long, default_value_t = 100)]
    pub max_failures: u32,

    /// Delay before retrying a failed frame read, in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub retry_delay_ms: u64,

    /// Radius of the landmark circles, in pixels.
    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u32).range(0..=1000),
    )]
    pub radius: u32,

    /// Do not draw lines between connected landmarks.
    #[arg(long)]
    pub no_connections: bool,

    /// Do not draw anything onto the frames.
    #[arg(long)]
    pub no_overlay: bool,

    /// Print `[id, x, y]` of this landmark of the first hand for every frame.
    #[arg(
        long,
        value_name = "ID",
        default_value_t = 4,
        value_parser = clap::value_parser!(u8).range(0..21),
    )]
    pub print_landmark: u8,

    /// Print `id x y` for every landmark of every hand.
    #[arg(long, conflicts_with = "quiet")]
    pub print_all: bool,

    /// Do not print landmark coordinates.
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, default_value = "Image")]
    pub title: String,
}

impl Args {
    pub fn webcam_options(&self) -> WebcamOptions {
        let mut options = WebcamOptions::default()
            .index(self.camera)
            .prefer(match self.prefer {
                Prefer::Resolution => ParamPreference::Resolution,
                Prefer::Framerate => ParamPreference::Framerate,
            });
        if let (Some(w), Some(h)) = (self.width, self.height) {
            options = options.resolution(Resolution::new(w, h));
        }
        if let Some(fps) = self.fps {
            options = options.fps(fps);
        }
        options
    }

    pub fn hands_options(&self) -> HandsOptions {
        HandsOptions {
            static_image_mode: self.static_image_mode,
            max_num_hands: self.max_hands,
            min_detection_confidence: self.detection_confidence,
            min_tracking_confidence: self.tracking_confidence,
        }
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            landmark_radius: self.radius,
            draw_connections: !self.no_connections,
            ..Default::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_consecutive_failures: self.max_failures,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn report(&self) -> Report {
        if self.quiet {
            Report::Nothing
        } else if self.print_all {
            Report::All
        } else {
            Report::Landmark(self.print_landmark.into())
        }
    }
}
