use std::path::Path;

use anyhow::{anyhow, ensure};
use itertools::zip_eq;

use crate::image::{AspectRatio, Image, Rect, Resolution};
use crate::landmark::{HandObservation, Handedness, Landmark, NUM_LANDMARKS};
use crate::nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs};
use crate::timer::Timer;

use super::palm::PalmDetector;
use super::tracking::{Landmarked, RoiTracker, TrackParams};
use super::{HandDetector, HandsOptions};

/// Relative amount of padding added around the landmarks of a tracked hand to form the next RoI.
const ROI_PADDING: f32 = 0.3;

/// Hand landmark estimation using a MediaPipe-style hand landmark network.
///
/// The network is expected to take a single NCHW RGB image with values in range 0.0 to 1.0 and to
/// produce at least 3 outputs: 21 screen landmarks (`[1, 63]`, in input pixel coordinates), a hand
/// presence score and a handedness score.
///
/// The network estimates a single hand per region of interest (RoI). Up to
/// [`HandsOptions::max_num_hands`] RoIs are tracked: each tracked hand is searched for in the
/// padded bounding box of its landmarks from the previous frame (unless
/// [`HandsOptions::static_image_mode`] is set), until its presence score drops below
/// [`HandsOptions::min_tracking_confidence`].
///
/// New hands are found by a [`PalmDetector`], if one was attached with
/// [`LandmarkNetwork::with_palm_detector`]. Palms scoring at least
/// [`HandsOptions::min_detection_confidence`] become new RoIs. Without a palm detector, the whole
/// image (padded to the network's aspect ratio) is used instead, which can only ever find one hand.
pub struct LandmarkNetwork {
    cnn: Cnn,
    palm: Option<PalmDetector>,
    options: HandsOptions,
    tracker: RoiTracker,
    t_infer: Timer,
    t_extract: Timer,
}

impl LandmarkNetwork {
    /// Loads the network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P, options: HandsOptions) -> anyhow::Result<Self> {
        options.validate()?;

        let nn = NeuralNetwork::load(path)?;
        ensure!(
            nn.num_outputs() >= 3,
            "hand landmark network must have at least 3 outputs, this one has {}",
            nn.num_outputs(),
        );
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        log::info!(
            "loaded hand landmark network (input resolution {})",
            cnn.input_resolution()
        );

        Ok(Self {
            cnn,
            palm: None,
            options,
            tracker: RoiTracker::new(),
            t_infer: Timer::new("infer"),
            t_extract: Timer::new("extract"),
        })
    }

    /// Uses `palm` to find new hands.
    pub fn with_palm_detector(mut self, palm: PalmDetector) -> Self {
        self.palm = Some(palm);
        self
    }
}

impl HandDetector for LandmarkNetwork {
    fn detect(&mut self, image: &Image) -> anyhow::Result<Vec<HandObservation>> {
        let res = image.resolution();
        let input_res = self.cnn.input_resolution();
        let aspect = input_res.aspect_ratio().unwrap_or(AspectRatio::SQUARE);
        let opts = self.options;

        // Palm detections are already filtered by the detection threshold, so the landmark
        // network only has to confirm there is a hand.
        let params = TrackParams {
            max_hands: opts.max_num_hands,
            static_mode: opts.static_image_mode,
            tracking_threshold: opts.min_tracking_confidence,
            seed_threshold: match self.palm {
                Some(_) => opts.min_tracking_confidence,
                None => opts.min_detection_confidence,
            },
        };

        let (cnn, t_infer, t_extract) = (&self.cnn, &self.t_infer, &self.t_extract);
        let estimate = |roi: Rect| -> anyhow::Result<Landmarked<HandObservation>> {
            let outputs = t_infer.time(|| cnn.estimate(image, roi))?;
            log::trace!("inference result: {:?}", outputs);
            let est = t_extract.time(|| extract(&outputs, input_res, roi))?;
            Ok(Landmarked {
                presence: est.presence,
                next_roi: next_roi(&est.landmarks, aspect),
                hand: est.into_observation(res),
            })
        };

        let palm = &mut self.palm;
        let detect = || -> anyhow::Result<Vec<Rect>> {
            match palm {
                Some(palm) => Ok(palm
                    .detect(image, opts.min_detection_confidence)?
                    .iter()
                    .map(|det| det.hand_roi().grow_to_fit_aspect(aspect))
                    .collect()),
                None => Ok(vec![res.pad_to_aspect_ratio(aspect)]),
            }
        };

        let hands = self.tracker.track(params, estimate, detect)?;
        log::trace!(
            "found {} hand(s), tracking {} RoI(s)",
            hands.len(),
            self.tracker.rois().len()
        );
        Ok(hands)
    }

    fn timers(&self) -> Vec<&Timer> {
        let mut timers = vec![&self.t_infer, &self.t_extract];
        if let Some(palm) = &self.palm {
            timers.extend(palm.timers());
        }
        timers
    }
}

/// Network outputs mapped to image pixel coordinates.
#[derive(Debug)]
struct RawEstimate {
    landmarks: [[f32; 3]; NUM_LANDMARKS],
    presence: f32,
    raw_handedness: f32,
}

impl RawEstimate {
    fn into_observation(self, res: Resolution) -> HandObservation {
        let (w, h) = (res.width() as f32, res.height() as f32);
        let landmarks = self
            .landmarks
            .map(|[x, y, z]| Landmark::new(x / w, y / h, z / w));
        let handedness = if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };
        HandObservation::new(landmarks, self.presence).with_handedness(handedness)
    }
}

fn extract(outputs: &Outputs, input_res: Resolution, roi: Rect) -> anyhow::Result<RawEstimate> {
    ensure!(
        outputs.len() >= 3,
        "expected at least 3 network outputs, got {}",
        outputs.len()
    );
    let screen_landmarks = &outputs[0];
    let scalar = |index: usize| {
        outputs[index]
            .as_slice()
            .first()
            .copied()
            .ok_or_else(|| anyhow!("network output {index} is empty"))
    };
    ensure!(
        screen_landmarks.as_slice().len() == NUM_LANDMARKS * 3,
        "unexpected landmark output shape {:?}",
        screen_landmarks.shape(),
    );

    // Landmarks are in network input pixels; map them through the RoI into the image.
    let (in_w, in_h) = (input_res.width() as f32, input_res.height() as f32);
    let mut landmarks = [[0.0; 3]; NUM_LANDMARKS];
    for (out, lm) in zip_eq(&mut landmarks, screen_landmarks.as_slice().chunks_exact(3)) {
        let [x, y] = roi.denormalize([lm[0] / in_w, lm[1] / in_h]);
        let z = lm[2] * roi.width() / in_w;
        *out = [x, y, z];
    }

    Ok(RawEstimate {
        landmarks,
        presence: scalar(1)?,
        raw_handedness: scalar(2)?,
    })
}

fn next_roi(landmarks: &[[f32; 3]], aspect: AspectRatio) -> Option<Rect> {
    Rect::bounding(landmarks.iter().map(|&[x, y, _]| [x, y]))
        .map(|rect| rect.grow_rel(ROI_PADDING).grow_to_fit_aspect(aspect))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::nn::tensor::Tensor;

    use super::*;

    fn outputs(landmarks: impl Fn(usize) -> [f32; 3], presence: f32, handedness: f32) -> Outputs {
        let lms = (0..NUM_LANDMARKS).flat_map(landmarks);
        [
            Tensor::from_iter(&[1, 63], lms),
            Tensor::from_iter(&[1, 1], [presence]),
            Tensor::from_iter(&[1, 1], [handedness]),
            Tensor::from_iter(&[1, 63], [0.0; 63]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn extract_maps_through_roi() {
        let input = Resolution::new(224, 224);
        let outputs = outputs(|i| [112.0, 56.0, i as f32], 0.9, 0.8);

        // The RoI is a 448x448 square at (100, 50).
        let roi = Rect::from_top_left(100.0, 50.0, 448.0, 448.0);
        let est = extract(&outputs, input, roi).unwrap();
        assert_eq!(est.presence, 0.9);
        assert_eq!(est.raw_handedness, 0.8);
        for (i, [x, y, z]) in est.landmarks.iter().enumerate() {
            assert_relative_eq!(*x, 100.0 + 224.0);
            assert_relative_eq!(*y, 50.0 + 112.0);
            assert_relative_eq!(*z, i as f32 * 2.0);
        }
    }

    #[test]
    fn extract_rejects_bad_outputs() {
        let input = Resolution::new(224, 224);
        let roi = Rect::from_top_left(0.0, 0.0, 224.0, 224.0);

        let too_few: Outputs = [Tensor::from_iter(&[1, 63], [0.0; 63])]
            .into_iter()
            .collect();
        assert!(extract(&too_few, input, roi).is_err());

        let wrong_shape: Outputs = [
            Tensor::from_iter(&[1, 42], [0.0; 42]),
            Tensor::from_iter(&[1, 1], [1.0]),
            Tensor::from_iter(&[1, 1], [1.0]),
        ]
        .into_iter()
        .collect();
        assert!(extract(&wrong_shape, input, roi).is_err());

        let empty_presence: Outputs = [
            Tensor::from_iter(&[1, 63], [0.0; 63]),
            Tensor::from_iter(&[1, 0], []),
            Tensor::from_iter(&[1, 1], [1.0]),
        ]
        .into_iter()
        .collect();
        assert!(extract(&empty_presence, input, roi).is_err());
    }

    #[test]
    fn observation_is_normalized() {
        let est = RawEstimate {
            landmarks: [[320.0, 120.0, 64.0]; NUM_LANDMARKS],
            presence: 0.75,
            raw_handedness: 0.2,
        };
        let obs = est.into_observation(Resolution::new(640, 480));
        assert_eq!(obs.confidence(), 0.75);
        assert_eq!(obs.handedness(), Some(Handedness::Left));
        for lm in obs.landmarks() {
            assert_relative_eq!(lm.x(), 0.5);
            assert_relative_eq!(lm.y(), 0.25);
            assert_relative_eq!(lm.z(), 0.1);
        }

        let est = RawEstimate {
            landmarks: [[0.0; 3]; NUM_LANDMARKS],
            presence: 1.0,
            raw_handedness: 0.9,
        };
        let obs = est.into_observation(Resolution::new(640, 480));
        assert_eq!(obs.handedness(), Some(Handedness::Right));
    }

    #[test]
    fn roi_follows_landmarks() {
        let mut landmarks = [[0.0; 3]; NUM_LANDMARKS];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            // Spread over a 100x50 box at (200, 300).
            *lm = [200.0 + (i % 2) as f32 * 100.0, 300.0 + (i % 3) as f32 * 25.0, 0.0];
        }

        let roi = next_roi(&landmarks, AspectRatio::SQUARE).unwrap();
        // 100x50 grown by 30% on every side is 160x80, squared to 160x160.
        assert_relative_eq!(roi.width(), 160.0);
        assert_relative_eq!(roi.height(), 160.0);
        assert_relative_eq!(roi.center()[0], 250.0);
        assert_relative_eq!(roi.center()[1], 325.0);

        assert!(next_roi(&[], AspectRatio::SQUARE).is_none());
    }
}
