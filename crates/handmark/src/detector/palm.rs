//! Palm detection with a MediaPipe-style single-shot detector.
//!
//! Palms are much easier to detect than whole hands: they are rigid, roughly square, and rarely
//! occluded by the fingers. Every detected palm seeds a region of interest for the landmark
//! network, which then covers the whole hand.

use std::path::Path;

use anyhow::ensure;

use crate::image::{Image, Rect, Resolution};
use crate::nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs};
use crate::timer::Timer;

use super::nms::NonMaxSuppression;

/// Number of values the network predicts per anchor: the box and 7 keypoints.
const BOX_PARAMS: usize = 4 + 2 * NUM_KEYPOINTS;

pub(super) const NUM_KEYPOINTS: usize = 7;

/// How much larger than the palm the hand region is.
const PALM_TO_HAND_SCALE: f32 = 2.6;

/// How far the hand region is moved from the palm towards the fingers, relative to palm size.
const PALM_TO_HAND_SHIFT: f32 = 0.5;

/// Palm keypoints, in the order the network outputs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

/// A detected palm, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PalmDetection {
    pub(super) confidence: f32,
    pub(super) rect: Rect,
    pub(super) keypoints: [[f32; 2]; NUM_KEYPOINTS],
}

impl PalmDetection {
    pub fn new(confidence: f32, rect: Rect, keypoints: [[f32; 2]; NUM_KEYPOINTS]) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    /// Detection score, from 0.0 to 1.0.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Bounding box of the palm.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoint(&self, kp: PalmKeypoint) -> [f32; 2] {
        self.keypoints[kp as usize]
    }

    /// Returns the square region that should contain the entire hand.
    ///
    /// The palm box is enlarged and moved along the direction from the wrist to the middle finger,
    /// since the fingers extend past the palm on that side.
    pub fn hand_roi(&self) -> Rect {
        let [wx, wy] = self.keypoint(PalmKeypoint::Wrist);
        let [mx, my] = self.keypoint(PalmKeypoint::MiddleFingerMcp);
        let [dx, dy] = [mx - wx, my - wy];
        let len = dx.hypot(dy);

        let size = self.rect.width().max(self.rect.height());
        let [mut cx, mut cy] = self.rect.center();
        if len > 0.0 {
            cx += dx / len * PALM_TO_HAND_SHIFT * size;
            cy += dy / len * PALM_TO_HAND_SHIFT * size;
        }
        Rect::from_center(cx, cy, size, size).grow_rel((PALM_TO_HAND_SCALE - 1.0) / 2.0)
    }
}

/// Anchor centers of the detector, normalized to the network input.
#[derive(Debug)]
struct Anchors(Vec<[f32; 2]>);

impl Anchors {
    /// Anchors of the palm detection network: 2 per cell of the stride 8 feature map, followed by 6
    /// per cell of the stride 16 map.
    fn palm(input_res: Resolution) -> Self {
        let mut anchors = Vec::new();
        for (stride, per_cell) in [(8, 2), (16, 6)] {
            let (w, h) = (input_res.width() / stride, input_res.height() / stride);
            for y in 0..h {
                for x in 0..w {
                    let center = [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32];
                    anchors.extend(std::iter::repeat(center).take(per_cell));
                }
            }
        }
        Self(anchors)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Finds palms using a MediaPipe palm detection model (lite or full).
///
/// The network is expected to take a single NCHW RGB image with values in range 0.0 to 1.0 and to
/// produce 2 outputs: box parameters (`[1, N, 18]`) and raw scores (`[1, N, 1]`) for each of its
/// `N` anchors.
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    nms: NonMaxSuppression,
    t_infer: Timer,
    t_extract: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    /// Loads the network from an ONNX file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let nn = NeuralNetwork::load(path)?;
        ensure!(
            nn.num_outputs() == 2,
            "palm detection network must have 2 outputs, this one has {}",
            nn.num_outputs(),
        );
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        let anchors = Anchors::palm(cnn.input_resolution());
        log::info!(
            "loaded palm detection network (input resolution {}, {} anchors)",
            cnn.input_resolution(),
            anchors.len(),
        );

        Ok(Self {
            cnn,
            anchors,
            nms: NonMaxSuppression::new(),
            t_infer: Timer::new("palm infer"),
            t_extract: Timer::new("palm extract"),
            t_nms: Timer::new("palm nms"),
        })
    }

    /// Detects palms with a score of at least `threshold` in `image`.
    ///
    /// Overlapping detections of the same palm are merged. The result is sorted by descending
    /// confidence.
    pub fn detect(&mut self, image: &Image, threshold: f32) -> anyhow::Result<Vec<PalmDetection>> {
        let input_res = self.cnn.input_resolution();
        let roi = match input_res.aspect_ratio() {
            Some(aspect) => image.resolution().pad_to_aspect_ratio(aspect),
            None => return Ok(Vec::new()),
        };

        let outputs = self.t_infer.time(|| self.cnn.estimate(image, roi))?;
        let mut detections = self
            .t_extract
            .time(|| extract(&outputs, &self.anchors, input_res, roi, threshold))?;
        let nms = &mut self.nms;
        let mut palms = self.t_nms.time(|| nms.process(&mut detections));
        palms.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        log::trace!("{} palm(s) detected", palms.len());
        Ok(palms)
    }

    /// Gives access to the suppression of overlapping detections.
    pub fn nms_mut(&mut self) -> &mut NonMaxSuppression {
        &mut self.nms
    }

    pub fn timers(&self) -> [&Timer; 3] {
        [&self.t_infer, &self.t_extract, &self.t_nms]
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Decodes all detections above `threshold` and maps them from network input pixels through `roi`
/// into the image.
fn extract(
    outputs: &Outputs,
    anchors: &Anchors,
    input_res: Resolution,
    roi: Rect,
    threshold: f32,
) -> anyhow::Result<Vec<PalmDetection>> {
    ensure!(
        outputs.len() == 2,
        "expected 2 palm detection outputs, got {}",
        outputs.len()
    );
    let (boxes, scores) = (&outputs[0], &outputs[1]);
    let n = anchors.len();
    ensure!(
        boxes.shape() == [1, n, BOX_PARAMS] && scores.shape() == [1, n, 1],
        "palm detection outputs {:?} and {:?} do not match {} anchors",
        boxes.shape(),
        scores.shape(),
        n,
    );

    let (in_w, in_h) = (input_res.width() as f32, input_res.height() as f32);
    let scale = roi.width() / in_w;
    let to_image = |x: f32, y: f32| roi.denormalize([x / in_w, y / in_h]);

    let mut detections = Vec::new();
    let params = boxes.as_slice().chunks_exact(BOX_PARAMS);
    for ((&score, params), &[ax, ay]) in scores.as_slice().iter().zip(params).zip(&anchors.0) {
        let confidence = sigmoid(score);
        if confidence < threshold {
            continue;
        }

        let (ax, ay) = (ax * in_w, ay * in_h);
        let [xc, yc] = to_image(params[0] + ax, params[1] + ay);
        let rect = Rect::from_center(xc, yc, params[2] * scale, params[3] * scale);
        let mut keypoints = [[0.0; 2]; NUM_KEYPOINTS];
        for (kp, xy) in keypoints.iter_mut().zip(params[4..].chunks_exact(2)) {
            *kp = to_image(xy[0] + ax, xy[1] + ay);
        }
        detections.push(PalmDetection::new(confidence, rect, keypoints));
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::nn::tensor::Tensor;

    use super::*;

    const INPUT: Resolution = Resolution::new(192, 192);

    #[test]
    fn palm_anchors() {
        let anchors = Anchors::palm(INPUT);
        assert_eq!(anchors.len(), 2016);
        assert_eq!(anchors.0[0], [0.5 / 24.0, 0.5 / 24.0]);
        assert_eq!(anchors.0[1], anchors.0[0]);
        assert_eq!(anchors.0[2], [1.5 / 24.0, 0.5 / 24.0]);
        assert_eq!(anchors.0[24 * 24 * 2], [0.5 / 12.0, 0.5 / 12.0]);
    }

    fn outputs(anchors: &Anchors, hits: &[(usize, f32, [f32; BOX_PARAMS])]) -> Outputs {
        let n = anchors.len();
        let mut boxes = vec![0.0; n * BOX_PARAMS];
        let mut scores = vec![-10.0; n];
        for &(index, score, params) in hits {
            scores[index] = score;
            boxes[index * BOX_PARAMS..][..BOX_PARAMS].copy_from_slice(&params);
        }
        [
            Tensor::from_iter(&[1, n, BOX_PARAMS], boxes),
            Tensor::from_iter(&[1, n, 1], scores),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn extract_thresholds_and_maps() {
        let anchors = Anchors::palm(INPUT);
        let mut params = [0.0; BOX_PARAMS];
        params[..4].copy_from_slice(&[4.0, -2.0, 20.0, 10.0]);
        params[4..6].copy_from_slice(&[0.0, 8.0]);
        params[8..10].copy_from_slice(&[0.0, -8.0]);
        let outputs = outputs(&anchors, &[(0, 5.0, params), (1, -5.0, params)]);

        // The network looked at a 384x384 region at (-10, 20), twice its input size.
        let roi = Rect::from_top_left(-10.0, 20.0, 384.0, 384.0);
        let detections = extract(&outputs, &anchors, INPUT, roi, 0.5).unwrap();
        assert_eq!(detections.len(), 1, "{detections:?}");

        let palm = &detections[0];
        assert_relative_eq!(palm.confidence(), sigmoid(5.0));
        // The first anchor sits at (4, 4) in input pixels.
        let [xc, yc] = palm.rect().center();
        assert_relative_eq!(xc, -10.0 + (4.0 + 4.0) * 2.0);
        assert_relative_eq!(yc, 20.0 + (4.0 - 2.0) * 2.0);
        assert_relative_eq!(palm.rect().width(), 40.0);
        assert_relative_eq!(palm.rect().height(), 20.0);
        let [wx, wy] = palm.keypoint(PalmKeypoint::Wrist);
        assert_relative_eq!(wx, -10.0 + 8.0);
        assert_relative_eq!(wy, 20.0 + 24.0);
        let [mx, my] = palm.keypoint(PalmKeypoint::MiddleFingerMcp);
        assert_relative_eq!(mx, -10.0 + 8.0);
        assert_relative_eq!(my, 20.0 - 8.0);
    }

    #[test]
    fn extract_rejects_mismatched_outputs() {
        let anchors = Anchors::palm(INPUT);
        let roi = Rect::from_top_left(0.0, 0.0, 192.0, 192.0);
        let wrong: Outputs = [
            Tensor::from_iter(&[1, 10, BOX_PARAMS], [0.0; 10 * BOX_PARAMS]),
            Tensor::from_iter(&[1, 10, 1], [0.0; 10]),
        ]
        .into_iter()
        .collect();
        assert!(extract(&wrong, &anchors, INPUT, roi, 0.5).is_err());
    }

    #[test]
    fn hand_roi_extends_towards_fingers() {
        let mut keypoints = [[0.0; 2]; NUM_KEYPOINTS];
        keypoints[PalmKeypoint::Wrist as usize] = [100.0, 140.0];
        keypoints[PalmKeypoint::MiddleFingerMcp as usize] = [100.0, 60.0];
        let palm = PalmDetection::new(0.9, Rect::from_center(100.0, 100.0, 40.0, 50.0), keypoints);

        let roi = palm.hand_roi();
        assert_relative_eq!(roi.width(), 50.0 * PALM_TO_HAND_SCALE);
        assert_relative_eq!(roi.height(), 50.0 * PALM_TO_HAND_SCALE);
        let [cx, cy] = roi.center();
        assert_relative_eq!(cx, 100.0);
        assert_relative_eq!(cy, 100.0 - 25.0);
    }
}
