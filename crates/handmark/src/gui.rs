//! A minimal window for presenting annotated frames.

use anyhow::anyhow;
use minifb::{Key, WindowOptions};

use crate::frame::Frame;
use crate::image::Resolution;

/// Presents frames to the user.
pub trait DisplaySink {
    /// Displays `frame`, replacing whatever was shown before.
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Returns whether the user asked to stop (closed the window or pressed an exit key).
    fn should_close(&self) -> bool;
}

impl<W: DisplaySink + ?Sized> DisplaySink for Box<W> {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        (**self).show(frame)
    }

    fn should_close(&self) -> bool {
        (**self).should_close()
    }
}

/// Keys that close the window while held.
const EXIT_KEYS: [Key; 2] = [Key::Q, Key::Escape];

/// A named on-screen window.
///
/// The underlying OS window is opened when the first frame is shown, at that frame's resolution.
/// If a later frame has a different resolution, the window is recreated to match.
pub struct Window {
    title: String,
    inner: Option<(minifb::Window, Resolution)>,
}

impl Window {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            inner: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn open(&mut self, res: Resolution) -> anyhow::Result<()> {
        log::debug!("creating window '{}' at {}", self.title, res);
        // Only one window exists at a time.
        self.inner = None;
        let win = minifb::Window::new(
            &self.title,
            res.width() as usize,
            res.height() as usize,
            WindowOptions::default(),
        )
        .map_err(|e| anyhow!("failed to open window '{}': {e}", self.title))?;
        self.inner = Some((win, res));
        Ok(())
    }
}

impl DisplaySink for Window {
    fn show(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let res = frame.resolution();
        if self.inner.as_ref().map(|(_, r)| *r) != Some(res) {
            self.open(res)?;
        }

        let buf = frame.image().to_0rgb(frame.order());
        if let Some((win, _)) = &mut self.inner {
            win.update_with_buffer(&buf, res.width() as usize, res.height() as usize)
                .map_err(|e| anyhow!("failed to update window '{}': {e}", self.title))?;
        }
        Ok(())
    }

    fn should_close(&self) -> bool {
        match &self.inner {
            Some((win, _)) => !win.is_open() || EXIT_KEYS.iter().any(|&k| win.is_key_down(k)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_opens_lazily() {
        let win = Window::new("Image");
        assert_eq!(win.title(), "Image");
        assert!(win.inner.is_none());
        assert!(!win.should_close());
    }
}
