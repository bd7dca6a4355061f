//! Video frame sources.

pub mod webcam;

use crate::frame::Frame;
use crate::timer::Timer;

/// A source of video frames, read one at a time.
pub trait FrameSource {
    /// Reads the next frame, blocking until one is available.
    ///
    /// An error means that this frame could not be obtained (for example because the device was
    /// disconnected, or the frame data was corrupted). Callers may retry: a later call can succeed.
    fn read(&mut self) -> anyhow::Result<Frame>;

    /// Returns profiling timers to include in the periodic frame rate log.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> anyhow::Result<Frame> {
        (**self).read()
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}
