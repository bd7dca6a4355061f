//! Merging of duplicate palm detections.
//!
//! Single-shot detectors report most palms several times, from neighboring anchors. Non-maximum
//! suppression reduces each cluster of overlapping detections to one: either the most confident
//! detection ([`SuppressionMode::Remove`]), or the confidence-weighted average of the cluster
//! ([`SuppressionMode::Average`], the default, which jitters less between frames).

use crate::image::Rect;

use super::palm::{PalmDetection, NUM_KEYPOINTS};

/// Describes what happens to detections that overlap a more confident one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SuppressionMode {
    /// Drop them.
    Remove,
    /// Average them into the more confident one, weighted by confidence.
    Average,
}

/// Non-maximum suppression of palm detections, configurable through
/// [`PalmDetector::nms_mut`][super::PalmDetector::nms_mut].
pub struct NonMaxSuppression {
    iou_thresh: f32,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// Intersection over union from which two detections are considered to overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a suppressor using [`SuppressionMode::Average`] and [`Self::DEFAULT_IOU_THRESH`].
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            mode: SuppressionMode::Average,
        }
    }

    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Drains `detections` and returns one detection per cluster of overlapping ones.
    ///
    /// Each output keeps the confidence of the most confident member of its cluster.
    pub fn process(&mut self, detections: &mut Vec<PalmDetection>) -> Vec<PalmDetection> {
        // Ascending, so that `pop` yields the most confident remaining detection.
        detections.sort_by(|a, b| a.confidence.total_cmp(&b.confidence));

        let mut out = Vec::new();
        while let Some(seed) = detections.pop() {
            let mut cluster = Vec::new();
            detections.retain(|other| {
                if seed.rect.iou(&other.rect) >= self.iou_thresh {
                    cluster.push(other.clone());
                    false
                } else {
                    true
                }
            });

            match self.mode {
                SuppressionMode::Remove => out.push(seed),
                SuppressionMode::Average => {
                    let confidence = seed.confidence;
                    cluster.push(seed);
                    out.push(weighted_average(&cluster, confidence));
                }
            }
        }
        out
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

fn weighted_average(cluster: &[PalmDetection], confidence: f32) -> PalmDetection {
    let total: f32 = cluster.iter().map(|det| det.confidence).sum();
    let mut rect = [0.0; 4];
    let mut keypoints = [[0.0; 2]; NUM_KEYPOINTS];
    for det in cluster {
        let weight = det.confidence / total;
        let [xc, yc] = det.rect.center();
        for (acc, v) in rect.iter_mut().zip([xc, yc, det.rect.width(), det.rect.height()]) {
            *acc += v * weight;
        }
        for (acc, kp) in keypoints.iter_mut().zip(det.keypoints) {
            acc[0] += kp[0] * weight;
            acc[1] += kp[1] * weight;
        }
    }

    let [xc, yc, w, h] = rect;
    PalmDetection::new(confidence, Rect::from_center(xc, yc, w, h), keypoints)
}
