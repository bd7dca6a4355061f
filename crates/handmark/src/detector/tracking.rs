//! Bookkeeping of the hands tracked across frames.

use std::mem;

use crate::image::Rect;

/// Result of running the landmark network on one region of interest.
#[derive(Debug)]
pub(super) struct Landmarked<T> {
    /// Hand presence score.
    pub presence: f32,
    /// Where to look for this hand in the next frame.
    pub next_roi: Option<Rect>,
    pub hand: T,
}

/// Keeps one region of interest (RoI) per tracked hand.
///
/// Every frame, each tracked RoI is handed to the landmark network first. Hands whose presence
/// score drops below the tracking threshold are forgotten. While fewer than the maximum number of
/// hands are tracked, new RoIs are requested from a detector; those overlapping an already tracked
/// hand are skipped, since the detector also finds hands that are being tracked.
#[derive(Debug)]
pub(super) struct RoiTracker {
    rois: Vec<Rect>,
    iou_thresh: f32,
}

/// Thresholds and limits of one [`RoiTracker::track`] call.
#[derive(Debug, Clone, Copy)]
pub(super) struct TrackParams {
    pub max_hands: usize,
    /// Forget all RoIs after the frame.
    pub static_mode: bool,
    /// Minimum presence to keep a tracked hand.
    pub tracking_threshold: f32,
    /// Minimum presence to start tracking a newly detected hand.
    pub seed_threshold: f32,
}

impl RoiTracker {
    /// RoIs overlapping at least this much are considered to contain the same hand.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    pub fn new() -> Self {
        Self {
            rois: Vec::new(),
            iou_thresh: Self::DEFAULT_IOU_THRESH,
        }
    }

    /// Regions the next frame will be searched in before asking the detector.
    pub fn rois(&self) -> &[Rect] {
        &self.rois
    }

    /// Processes one frame.
    ///
    /// `estimate` runs the landmark network on a RoI. `detect` is only called when fewer than
    /// `params.max_hands` hands were found in the tracked RoIs, and returns candidate RoIs, most
    /// promising first.
    pub fn track<T, E, D>(
        &mut self,
        params: TrackParams,
        mut estimate: E,
        detect: D,
    ) -> anyhow::Result<Vec<T>>
    where
        E: FnMut(Rect) -> anyhow::Result<Landmarked<T>>,
        D: FnOnce() -> anyhow::Result<Vec<Rect>>,
    {
        let tracked = mem::take(&mut self.rois);
        let mut hands = Vec::new();
        if params.max_hands == 0 {
            return Ok(hands);
        }

        // RoIs searched this frame, and the RoIs to search next frame.
        let mut searched = Vec::new();
        let mut next = Vec::new();

        for roi in tracked {
            if hands.len() == params.max_hands {
                break;
            }
            let result = estimate(roi)?;
            if result.presence < params.tracking_threshold {
                log::trace!("lost hand in {:?} (presence {})", roi, result.presence);
                continue;
            }
            if let Some(next_roi) = result.next_roi {
                if self.overlaps_any(&next, &next_roi) {
                    log::trace!("dropping {:?}, another tracked hand moved onto it", next_roi);
                    continue;
                }
                next.push(next_roi);
            }
            searched.push(roi);
            hands.push(result.hand);
        }

        if hands.len() < params.max_hands {
            for seed in detect()? {
                if hands.len() == params.max_hands {
                    break;
                }
                if self.overlaps_any(&searched, &seed) || self.overlaps_any(&next, &seed) {
                    continue;
                }
                let result = estimate(seed)?;
                if result.presence < params.seed_threshold {
                    log::trace!("no hand in {:?} (presence {})", seed, result.presence);
                    continue;
                }
                searched.push(seed);
                next.extend(result.next_roi);
                hands.push(result.hand);
            }
        }

        if !params.static_mode {
            self.rois = next;
        }
        Ok(hands)
    }

    fn overlaps_any(&self, rois: &[Rect], roi: &Rect) -> bool {
        rois.iter().any(|other| other.iou(roi) >= self.iou_thresh)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    const PARAMS: TrackParams = TrackParams {
        max_hands: 2,
        static_mode: false,
        tracking_threshold: 0.5,
        seed_threshold: 0.5,
    };

    fn square(x: f32) -> Rect {
        Rect::from_top_left(x, 0.0, 100.0, 100.0)
    }

    /// Pretends a hand is present in every RoI whose left edge is one of `present`, and that it
    /// moved 1 pixel to the right.
    fn estimator<'a>(
        present: &'a [f32],
        calls: &'a RefCell<Vec<Rect>>,
    ) -> impl FnMut(Rect) -> anyhow::Result<Landmarked<f32>> + 'a {
        move |roi| {
            calls.borrow_mut().push(roi);
            let hit = present.iter().any(|&x| (roi.x() - x).abs() < 0.5);
            Ok(Landmarked {
                presence: if hit { 0.9 } else { 0.1 },
                next_roi: Some(square(roi.x() + 1.0)),
                hand: roi.x(),
            })
        }
    }

    #[test]
    fn no_hands_requested() {
        let mut tracker = RoiTracker::new();
        tracker.rois = vec![square(0.0)];
        let calls = RefCell::new(Vec::new());
        let params = TrackParams {
            max_hands: 0,
            ..PARAMS
        };
        let hands = tracker
            .track(params, estimator(&[0.0], &calls), || panic!("detector was run"))
            .unwrap();
        assert!(hands.is_empty());
        assert!(calls.borrow().is_empty());
        assert!(tracker.rois().is_empty());
    }

    #[test]
    fn seeds_up_to_max_hands() {
        let mut tracker = RoiTracker::new();
        let calls = RefCell::new(Vec::new());
        let seeds = vec![square(0.0), square(200.0), square(400.0)];
        let hands = tracker
            .track(PARAMS, estimator(&[0.0, 200.0, 400.0], &calls), || Ok(seeds))
            .unwrap();
        assert_eq!(hands, [0.0, 200.0]);
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(tracker.rois(), [square(1.0), square(201.0)]);
    }

    #[test]
    fn tracked_hands_skip_detection() {
        let mut tracker = RoiTracker::new();
        tracker.rois = vec![square(0.0), square(200.0)];
        let calls = RefCell::new(Vec::new());
        let hands = tracker
            .track(PARAMS, estimator(&[0.0, 200.0], &calls), || panic!("detector was run"))
            .unwrap();
        assert_eq!(hands, [0.0, 200.0]);
        assert_eq!(tracker.rois(), [square(1.0), square(201.0)]);
    }

    #[test]
    fn detections_of_tracked_hands_are_ignored() {
        let mut tracker = RoiTracker::new();
        tracker.rois = vec![square(0.0)];
        let calls = RefCell::new(Vec::new());
        let seeds = vec![square(5.0), square(300.0)];
        let hands = tracker
            .track(PARAMS, estimator(&[0.0, 5.0, 300.0], &calls), || Ok(seeds))
            .unwrap();
        assert_eq!(hands, [0.0, 300.0]);
        assert_eq!(*calls.borrow(), [square(0.0), square(300.0)]);
    }

    #[test]
    fn lost_hands_are_forgotten() {
        let mut tracker = RoiTracker::new();
        tracker.rois = vec![square(0.0), square(200.0)];
        let calls = RefCell::new(Vec::new());
        let hands = tracker
            .track(PARAMS, estimator(&[200.0], &calls), || Ok(Vec::new()))
            .unwrap();
        assert_eq!(hands, [200.0]);
        assert_eq!(tracker.rois(), [square(201.0)]);
    }

    #[test]
    fn seeds_need_seed_threshold() {
        let mut tracker = RoiTracker::new();
        let calls = RefCell::new(Vec::new());
        let params = TrackParams {
            seed_threshold: 0.95,
            ..PARAMS
        };
        let hands = tracker
            .track(params, estimator(&[0.0], &calls), || Ok(vec![square(0.0)]))
            .unwrap();
        assert!(hands.is_empty());
        assert!(tracker.rois().is_empty());
    }

    #[test]
    fn converging_hands_are_merged() {
        let mut tracker = RoiTracker::new();
        // Both RoIs contain the same hand and end up in the same place.
        tracker.rois = vec![square(0.0), square(0.2)];
        let calls = RefCell::new(Vec::new());
        let mut estimate = estimator(&[0.0, 0.2], &calls);
        let hands = tracker
            .track(
                PARAMS,
                |roi| {
                    let mut result = estimate(roi)?;
                    result.next_roi = Some(square(1.0));
                    Ok(result)
                },
                || Ok(Vec::new()),
            )
            .unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(tracker.rois(), [square(1.0)]);
    }

    #[test]
    fn static_mode_forgets_rois() {
        let mut tracker = RoiTracker::new();
        let calls = RefCell::new(Vec::new());
        let params = TrackParams {
            static_mode: true,
            ..PARAMS
        };
        let hands = tracker
            .track(params, estimator(&[0.0], &calls), || Ok(vec![square(0.0)]))
            .unwrap();
        assert_eq!(hands, [0.0]);
        assert!(tracker.rois().is_empty());
    }
}
