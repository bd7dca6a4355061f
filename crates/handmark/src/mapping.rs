//! Mapping normalized landmark coordinates to frame pixels.

use crate::{
    image::Resolution,
    landmark::{HandObservation, Landmark, PixelLandmark},
};

/// Maps a normalized landmark position to integer pixel coordinates in a frame of size `res`.
///
/// Computes `(floor(x * width), floor(y * height))`. Coordinates in range 0.0 to 1.0 are clamped to
/// the last pixel column and row, so every landmark inside the frame maps to a valid pixel.
/// Coordinates outside of that range (a hand that is partially out of view) are passed through and
/// may lie outside of the frame.
pub fn map_to_pixel(landmark: &Landmark, res: Resolution) -> (i32, i32) {
    (
        map_axis(landmark.x(), res.width()),
        map_axis(landmark.y(), res.height()),
    )
}

fn map_axis(t: f32, size: u32) -> i32 {
    // `as` saturates, so NaN maps to 0 and huge values to `i32::MAX`.
    let px = (t * size as f32).floor() as i32;
    if (0.0..=1.0).contains(&t) {
        let last = (size as i32).saturating_sub(1).max(0);
        px.min(last)
    } else {
        px
    }
}

/// Maps every landmark of `hand` to pixel coordinates, tagged with the landmark identifier.
pub fn map_hand(hand: &HandObservation, res: Resolution) -> Vec<PixelLandmark> {
    hand.landmarks()
        .iter()
        .enumerate()
        .map(|(id, lm)| {
            let (x, y) = map_to_pixel(lm, res);
            PixelLandmark { id, x, y }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::landmark::NUM_LANDMARKS;

    use super::*;

    const VGA: Resolution = Resolution::new(640, 480);

    fn map(x: f32, y: f32, res: Resolution) -> (i32, i32) {
        map_to_pixel(&Landmark::new(x, y, 0.0), res)
    }

    #[test]
    fn floors() {
        assert_eq!(map(0.5, 0.5, VGA), (320, 240));
        assert_eq!(map(0.0, 0.0, VGA), (0, 0));
        assert_eq!(map(0.25, 0.75, Resolution::new(10, 10)), (2, 7));
        assert_eq!(map(0.999, 0.999, Resolution::new(10, 10)), (9, 9));
    }

    #[test]
    fn clamps_upper_edge() {
        assert_eq!(map(1.0, 1.0, VGA), (639, 479));
    }

    #[test]
    fn out_of_frame_passes_through() {
        assert_eq!(map(-0.1, 0.5, VGA), (-64, 240));
        assert_eq!(map(1.5, 0.5, VGA), (960, 240));
        assert_eq!(map(0.5, 1.25, VGA), (320, 600));
    }

    #[test]
    fn empty_frame() {
        assert_eq!(map(0.5, 1.0, Resolution::new(0, 0)), (0, 0));
    }

    #[test]
    fn in_range_always_inside_frame() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..1000 {
            let res = Resolution::new(rng.u32(1..4000), rng.u32(1..4000));
            let (x, y) = map(rng.f32(), rng.f32(), res);
            assert!(x >= 0 && x < res.width() as i32, "{x} outside {res}");
            assert!(y >= 0 && y < res.height() as i32, "{y} outside {res}");
        }

        for res in [Resolution::new(1, 1), VGA] {
            for t in [0.0, 1.0] {
                let (x, y) = map(t, t, res);
                assert!(x >= 0 && x < res.width() as i32);
                assert!(y >= 0 && y < res.height() as i32);
            }
        }
    }

    #[test]
    fn hand_ids() {
        let mut landmarks = [Landmark::default(); NUM_LANDMARKS];
        landmarks[4] = Landmark::new(0.25, 0.5, 0.0);
        let hand = HandObservation::new(landmarks, 1.0);

        let pixels = map_hand(&hand, VGA);
        assert_eq!(pixels.len(), NUM_LANDMARKS);
        assert!(pixels.iter().enumerate().all(|(i, px)| px.id == i));
        assert_eq!(pixels[4], PixelLandmark { id: 4, x: 160, y: 240 });
    }
}
