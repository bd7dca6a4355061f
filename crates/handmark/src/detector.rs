//! Hand detection.
//!
//! [`HandDetector`] is the seam between the frame loop and whatever produces hand landmarks. The
//! bundled implementation is [`LandmarkNetwork`], which runs a hand landmark network through
//! `tract`, optionally seeded by a [`PalmDetector`] so that several hands can be tracked at once.

mod network;
mod nms;
mod palm;
mod tracking;

use anyhow::ensure;

use crate::image::{ChannelOrder, Image};
use crate::landmark::HandObservation;
use crate::timer::Timer;

pub use network::LandmarkNetwork;
pub use nms::{NonMaxSuppression, SuppressionMode};
pub use palm::{PalmDetection, PalmDetector, PalmKeypoint};

/// Detects hands and their landmarks in an image.
pub trait HandDetector {
    /// Detects all hands in `image`.
    ///
    /// `image` is stored in the channel order returned by [`HandDetector::channel_order`]. Landmark
    /// positions are normalized to `image` (see [`Landmark`][crate::landmark::Landmark]).
    ///
    /// Finding no hands is not an error and results in an empty list.
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandObservation>>;

    /// Returns the channel order this detector expects its input images in.
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    /// Returns profiling timers to include in the periodic frame rate log.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandObservation>> {
        (**self).detect(image)
    }

    fn channel_order(&self) -> ChannelOrder {
        (**self).channel_order()
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

/// Detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandsOptions {
    /// Treat every image as unrelated to the previous one instead of tracking hands across frames.
    pub static_image_mode: bool,
    /// Maximum number of hands to report.
    pub max_num_hands: usize,
    /// Minimum confidence for a hand to be reported when it is first found.
    pub min_detection_confidence: f32,
    /// Minimum confidence for a hand found in a previous frame to keep being tracked.
    pub min_tracking_confidence: f32,
}

impl Default for HandsOptions {
    fn default() -> Self {
        Self {
            static_image_mode: false,
            max_num_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl HandsOptions {
    /// Checks that both confidence thresholds lie in range 0.0 to 1.0.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "`{name}` must be in range 0.0 to 1.0 (got {value})"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = HandsOptions::default();
        assert!(!options.static_image_mode);
        assert_eq!(options.max_num_hands, 2);
        assert_eq!(options.min_detection_confidence, 0.5);
        assert_eq!(options.min_tracking_confidence, 0.5);
        options.validate().unwrap();
    }

    #[test]
    fn validate_confidences() {
        let ok = HandsOptions {
            min_detection_confidence: 0.0,
            min_tracking_confidence: 1.0,
            ..Default::default()
        };
        ok.validate().unwrap();

        for bad in [-0.1, 1.5, f32::NAN] {
            let options = HandsOptions {
                min_detection_confidence: bad,
                ..Default::default()
            };
            assert!(options.validate().is_err(), "{bad}");
            let options = HandsOptions {
                min_tracking_confidence: bad,
                ..Default::default()
            };
            assert!(options.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn boxed_detector() {
        struct Nothing;
        impl HandDetector for Nothing {
            fn detect(&mut self, _: &Image) -> anyhow::Result<Vec<HandObservation>> {
                Ok(Vec::new())
            }
        }

        let mut boxed: Box<dyn HandDetector> = Box::new(Nothing);
        assert_eq!(boxed.channel_order(), ChannelOrder::Rgb);
        assert!(boxed.detect(&Image::new(2, 2)).unwrap().is_empty());
    }
}
