//! Drawing landmarks and the frame rate onto frames.

use crate::frame::Frame;
use crate::image::{draw, Color};
use crate::landmark::{HandObservation, CONNECTIONS};
use crate::mapping::map_to_pixel;

/// Position of the bottom left corner of the frame rate text.
const FPS_POS: (i32, i32) = (10, 70);

/// Appearance of the overlay.
///
/// All colors are given in RGB, regardless of the channel order of the frame that is drawn on.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub landmark_radius: u32,
    pub landmark_color: Color,
    /// Whether to connect landmarks with lines according to [`CONNECTIONS`].
    pub draw_connections: bool,
    pub connection_color: Color,
    pub connection_width: u32,
    pub fps_color: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            landmark_radius: 5,
            landmark_color: Color::MAGENTA,
            draw_connections: true,
            connection_color: Color::from_rgb8(224, 224, 224),
            connection_width: 2,
            fps_color: Color::MAGENTA,
        }
    }
}

/// Draws the landmarks of `hand` onto `frame`.
///
/// Connections are drawn first, so that the landmark circles end up on top of them. Parts of the
/// hand that lie outside of the frame are clipped.
pub fn draw_hand(frame: &mut Frame, hand: &HandObservation, style: &OverlayStyle) {
    let res = frame.resolution();
    let order = frame.order();
    let points = hand.landmarks().map(|lm| map_to_pixel(&lm, res));
    let image = frame.image_mut();

    if style.draw_connections {
        let color = style.connection_color.in_order(order);
        for (a, b) in CONNECTIONS {
            let (ax, ay) = points[a.index()];
            let (bx, by) = points[b.index()];
            draw::line(image, ax, ay, bx, by)
                .color(color)
                .stroke_width(style.connection_width);
        }
    }

    let color = style.landmark_color.in_order(order);
    for (x, y) in points {
        draw::circle(image, x, y, style.landmark_radius)
            .color(color)
            .filled();
    }
}

/// Writes the frame rate onto `frame`, rounded down to an integer.
///
/// `None` (no measurement available yet) is rendered as `--`.
pub fn draw_fps(frame: &mut Frame, fps: Option<f32>, style: &OverlayStyle) {
    let text = fps_text(fps);
    let color = style.fps_color.in_order(frame.order());
    let (x, y) = FPS_POS;
    draw::text(frame.image_mut(), x, y, &text)
        .color(color)
        .align_left()
        .align_bottom();
}

fn fps_text(fps: Option<f32>) -> String {
    match fps {
        Some(fps) if fps.is_finite() => format!("{}", fps as i32),
        _ => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::image::{ChannelOrder, Image, Resolution};
    use crate::landmark::{Landmark, NUM_LANDMARKS};

    use super::*;

    fn blank(order: ChannelOrder) -> Frame {
        Frame::new(Image::filled(Resolution::new(100, 100), Color::BLACK), order)
    }

    fn hand_at(x: f32, y: f32) -> HandObservation {
        HandObservation::new([Landmark::new(x, y, 0.0); NUM_LANDMARKS], 1.0)
    }

    #[test]
    fn fps_text_truncates() {
        assert_eq!(fps_text(Some(29.97)), "29");
        assert_eq!(fps_text(Some(0.5)), "0");
        assert_eq!(fps_text(None), "--");
        assert_eq!(fps_text(Some(f32::INFINITY)), "--");
    }

    #[test]
    fn landmarks_are_drawn_at_mapped_position() {
        let mut frame = blank(ChannelOrder::Rgb);
        draw_hand(&mut frame, &hand_at(0.5, 0.25), &OverlayStyle::default());
        assert_eq!(frame.image().get(50, 25), Color::MAGENTA);
        assert_eq!(frame.image().get(52, 27), Color::MAGENTA);
        assert_eq!(frame.image().get(90, 90), Color::BLACK);
    }

    #[test]
    fn colors_follow_channel_order() {
        let style = OverlayStyle {
            landmark_color: Color::RED,
            ..Default::default()
        };
        let mut frame = blank(ChannelOrder::Bgr);
        draw_hand(&mut frame, &hand_at(0.5, 0.5), &style);
        assert_eq!(frame.image().get(50, 50), Color::BLUE);
        assert_eq!(frame.to_order(ChannelOrder::Rgb).get(50, 50), Color::RED);
    }

    #[test]
    fn connections_are_optional() {
        let mut landmarks = [Landmark::new(0.1, 0.1, 0.0); NUM_LANDMARKS];
        // The wrist is connected to the thumb's first joint.
        landmarks[1] = Landmark::new(0.9, 0.1, 0.0);
        let hand = HandObservation::new(landmarks, 1.0);
        let style = OverlayStyle {
            landmark_radius: 1,
            ..Default::default()
        };

        let on_line = |frame: &Frame| {
            (9..=11).any(|y| frame.image().get(50, y) == style.connection_color)
        };

        let mut frame = blank(ChannelOrder::Rgb);
        draw_hand(&mut frame, &hand, &style);
        assert!(on_line(&frame));

        let mut frame = blank(ChannelOrder::Rgb);
        let no_lines = OverlayStyle {
            draw_connections: false,
            ..style.clone()
        };
        draw_hand(&mut frame, &hand, &no_lines);
        assert!(!on_line(&frame));
    }

    #[test]
    fn out_of_frame_hand_is_clipped() {
        let mut frame = blank(ChannelOrder::Rgb);
        draw_hand(&mut frame, &hand_at(-0.5, 1.5), &OverlayStyle::default());
        assert!(frame.image().data().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn fps_is_drawn_top_left() {
        let mut frame = blank(ChannelOrder::Rgb);
        draw_fps(&mut frame, Some(30.0), &OverlayStyle::default());
        let image = frame.image();
        let drawn = |x0: u32, x1: u32, y0: u32, y1: u32| {
            (y0..y1).any(|y| (x0..x1).any(|x| image.get(x, y) == Color::MAGENTA))
        };
        assert!(drawn(10, 40, 45, 71));
        assert!(!drawn(50, 100, 0, 100));
    }
}
