//! Primitive drawing operations.
//!
//! Every function in here returns a guard object that performs the drawing when dropped, so that
//! optional customization can be chained onto the call:
//!
//! ```
//! # use handmark_image::{draw, Color, Image};
//! let mut image = Image::new(32, 32);
//! draw::line(&mut image, 0, 0, 31, 31).color(Color::GREEN).stroke_width(2);
//! draw::circle(&mut image, 16, 16, 4).filled();
//! ```
//!
//! Anything falling outside of the image is clipped.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle, Rectangle},
    text::{self, Text, TextStyleBuilder},
};

use crate::{Color, Image};

/// Guard returned by [`circle`]; draws the circle when dropped and allows customization.
pub struct DrawCircle<'a> {
    image: &'a mut Image,
    x: i32,
    y: i32,
    radius: u32,
    color: Color,
    filled: bool,
}

impl DrawCircle<'_> {
    /// Sets the circle's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Fills the circle instead of only drawing a 1 pixel wide outline.
    pub fn filled(&mut self) -> &mut Self {
        self.filled = true;
        self
    }

    /// Returns the radius to render with, or `None` if the circle cannot touch the image.
    ///
    /// Rendering walks every row of the circle, so filled circles larger than needed to cover the
    /// whole image are shrunk to just cover it.
    fn visible_radius(&self) -> Option<u32> {
        let (w, h) = (self.image.width(), self.image.height());
        if w == 0 || h == 0 {
            return None;
        }
        let (max_x, max_y) = (f64::from(w - 1), f64::from(h - 1));
        let (x, y) = (f64::from(self.x), f64::from(self.y));
        let radius = f64::from(self.radius);

        let near = (x - x.clamp(0.0, max_x)).hypot(y - y.clamp(0.0, max_y));
        if radius > near + 1.0 {
            let far = (x.max(max_x - x)).hypot(y.max(max_y - y));
            if radius > far + 1.0 {
                return self.filled.then(|| far.ceil() as u32 + 1);
            }
        } else if radius + 1.0 < near {
            return None;
        }
        Some(self.radius)
    }
}

impl Drop for DrawCircle<'_> {
    fn drop(&mut self) {
        let style = if self.filled {
            PrimitiveStyle::with_fill(self.color)
        } else {
            PrimitiveStyle::with_stroke(self.color, 1)
        };
        let Some(radius) = self.visible_radius() else {
            return;
        };
        // A radius of 0 still covers the center pixel.
        let diameter = radius.saturating_mul(2).saturating_add(1);
        render(
            self.image,
            &Circle::with_center(Point::new(self.x, self.y), diameter).into_styled(style),
        );
    }
}

/// Guard returned by [`line`]; draws the line when dropped and allows customization.
pub struct DrawLine<'a> {
    image: &'a mut Image,
    start_x: i32,
    start_y: i32,
    end_x: i32,
    end_y: i32,
    color: Color,
    stroke_width: u32,
}

impl DrawLine<'_> {
    /// Sets the line's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the line's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawLine<'_> {
    fn drop(&mut self) {
        let line = Line::new(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        );
        render(
            self.image,
            &line.into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width)),
        );
    }
}

/// Guard returned by [`text`]; draws the text when dropped and allows customization.
pub struct DrawText<'a> {
    image: &'a mut Image,
    x: i32,
    y: i32,
    text: &'a str,
    color: Color,
    alignment: text::Alignment,
    baseline: text::Baseline,
}

impl DrawText<'_> {
    /// Sets the text color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Aligns the top of the text with the `y` coordinate.
    pub fn align_top(&mut self) -> &mut Self {
        self.baseline = text::Baseline::Top;
        self
    }

    /// Aligns the bottom of the text with the `y` coordinate.
    pub fn align_bottom(&mut self) -> &mut Self {
        self.baseline = text::Baseline::Bottom;
        self
    }

    /// Aligns the left side of the text with the `x` coordinate.
    pub fn align_left(&mut self) -> &mut Self {
        self.alignment = text::Alignment::Left;
        self
    }
}

impl Drop for DrawText<'_> {
    fn drop(&mut self) {
        // `FONT_10X20` has glyphs for ASCII only.
        let character_style = MonoTextStyle::new(&FONT_10X20, self.color);
        let text_style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(self.baseline)
            .build();
        render(
            self.image,
            &Text::with_text_style(
                self.text,
                Point::new(self.x, self.y),
                character_style,
                text_style,
            ),
        );
    }
}

/// Draws a circle of the given radius, centered at `(x, y)`.
///
/// Only the outline is drawn unless [`DrawCircle::filled`] is called.
pub fn circle(image: &mut Image, x: i32, y: i32, radius: u32) -> DrawCircle<'_> {
    DrawCircle {
        image,
        x,
        y,
        radius,
        color: Color::RED,
        filled: false,
    }
}

/// Draws a line segment between two points.
pub fn line(image: &mut Image, start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> DrawLine<'_> {
    DrawLine {
        image,
        start_x,
        start_y,
        end_x,
        end_y,
        color: Color::BLUE,
        stroke_width: 1,
    }
}

/// Draws a text string.
///
/// By default, the text is drawn centered horizontally and vertically around `x` and `y`.
pub fn text<'a>(image: &'a mut Image, x: i32, y: i32, text: &'a str) -> DrawText<'a> {
    DrawText {
        image,
        x,
        y,
        text,
        color: Color::RED,
        alignment: text::Alignment::Center,
        baseline: text::Baseline::Middle,
    }
}

fn render<D: Drawable<Color = Color>>(image: &mut Image, drawable: &D) {
    if let Err(never) = drawable.draw(&mut Target(image)) {
        match never {}
    }
}

/// Clips everything drawn to the bounds of the wrapped image.
struct Target<'a>(&'a mut Image);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(self.0.width(), self.0.height()))
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.0.width(), self.0.height());
        for Pixel(point, color) in pixels {
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                if x < w && y < h {
                    self.0.set(x, y, color);
                }
            }
        }
        Ok(())
    }
}
