//! V4L2 webcam capture.
//!
//! Only capture devices that can deliver JPEG or MJPEG frames are supported; their frames are
//! decoded to RGB on the calling thread.

use std::path::PathBuf;

use anyhow::{bail, Context};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::frame::Frame;
use crate::image::{ChannelOrder, Image, Resolution};
use crate::timer::Timer;

use super::FrameSource;

/// What to give up first when the camera cannot meet both the resolution and frame rate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum ParamPreference {
    /// Keep the resolution, lower the frame rate.
    #[default]
    Resolution,
    /// Keep the frame rate, lower the resolution.
    Framerate,
}

#[derive(Debug, Default, Clone, Copy)]
struct FramePrefs {
    resolution: Option<Resolution>,
    fps: Option<u32>,
    pref: ParamPreference,
}

/// Device selection and format negotiation options.
#[derive(Debug, Default, Clone)]
pub struct WebcamOptions {
    index: u32,
    frame: FramePrefs,
}

impl WebcamOptions {
    /// Selects the capture device `/dev/video<index>`.
    ///
    /// By default, device 0 is opened.
    #[inline]
    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Requests frames of at least `resolution`, if the camera supports that.
    #[inline]
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.frame.resolution = Some(resolution);
        self
    }

    /// Requests at least `fps` frames per second, if the camera supports that.
    #[inline]
    pub fn fps(mut self, fps: u32) -> Self {
        self.frame.fps = Some(fps);
        self
    }

    /// Defaults to [`ParamPreference::Resolution`].
    #[inline]
    pub fn prefer(mut self, pref: ParamPreference) -> Self {
        self.frame.pref = pref;
        self
    }

    fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/video{}", self.index))
    }
}

#[derive(Clone, Copy)]
struct FrameFormat {
    resolution: Resolution,
    frame_interval: Fract,
}

impl FrameFormat {
    fn fps(&self) -> f32 {
        1.0 / self.frame_interval.as_f32()
    }
}

fn negotiate_format(device: &Device, mut prefs: FramePrefs) -> anyhow::Result<(PixFormat, Fract)> {
    let pixel_format = jpeg_pixel_format(device)?;
    let formats = frame_formats(device, pixel_format)?;
    log::trace!("{} candidate formats", formats.len());

    loop {
        if let Some(fmt) = negotiate_format_step(&formats, prefs) {
            let (w, h) = (fmt.resolution.width(), fmt.resolution.height());
            return Ok((PixFormat::new(w, h, pixel_format), fmt.frame_interval));
        }

        log::debug!("no format satisfies {:?}", prefs);
        if !relax(&mut prefs) {
            bail!("device offers no usable format");
        }
        log::debug!("relaxed to {:?}", prefs);
    }
}

fn jpeg_pixel_format(device: &Device) -> anyhow::Result<Pixelformat> {
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let pixel_format = format?.pixelformat();
        if [Pixelformat::JPEG, Pixelformat::MJPG].contains(&pixel_format) {
            return Ok(pixel_format);
        }
    }
    bail!("device offers neither JPEG nor MJPEG frames")
}

/// Lists every supported combination of frame size and frame interval.
fn frame_formats(device: &Device, pixel_format: Pixelformat) -> anyhow::Result<Vec<FrameFormat>> {
    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixel_format)? else {
        bail!("device reports a frame size range, only discrete sizes are supported");
    };

    let mut formats = Vec::new();
    for size in sizes {
        let (width, height) = (size.width(), size.height());
        let FrameIntervals::Discrete(intervals) =
            device.frame_intervals(pixel_format, width, height)?
        else {
            bail!("device reports a frame interval range for {width}x{height}");
        };
        formats.extend(intervals.into_iter().map(|interval| FrameFormat {
            resolution: Resolution::new(width, height),
            frame_interval: *interval.fract(),
        }));
    }
    Ok(formats)
}

/// Drops the least important preference; returns `false` once there is nothing left to drop.
fn relax(prefs: &mut FramePrefs) -> bool {
    match prefs.pref {
        ParamPreference::Resolution => {
            prefs.fps.take().is_some() || prefs.resolution.take().is_some()
        }
        ParamPreference::Framerate => {
            prefs.resolution.take().is_some() || prefs.fps.take().is_some()
        }
    }
}

fn negotiate_format_step(formats: &[FrameFormat], prefs: FramePrefs) -> Option<FrameFormat> {
    let mut eligible = formats
        .iter()
        .filter(|fmt| {
            prefs.resolution.map_or(true, |res| {
                fmt.resolution.width() >= res.width() && fmt.resolution.height() >= res.height()
            }) && prefs.fps.map_or(true, |fps| fmt.fps().round() >= fps as f32)
        })
        .copied()
        .collect::<Vec<_>>();
    match prefs.pref {
        ParamPreference::Resolution => eligible.sort_by(|a, b| {
            (a.resolution.num_pixels().cmp(&b.resolution.num_pixels()))
                .then(a.fps().total_cmp(&b.fps()))
        }),
        ParamPreference::Framerate => eligible.sort_by(|a, b| {
            (a.fps().total_cmp(&b.fps()))
                .then(a.resolution.num_pixels().cmp(&b.resolution.num_pixels()))
        }),
    }
    eligible.last().copied()
}

/// A webcam yielding a stream of RGB [`Frame`]s.
pub struct Webcam {
    stream: ReadStream,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the webcam selected by `options`.
    ///
    /// Blocks while the device starts streaming, which can take a few hundred milliseconds.
    pub fn open(options: WebcamOptions) -> anyhow::Result<Self> {
        let path = options.device_path();
        let dev = Device::open(&path)
            .with_context(|| format!("failed to open video device '{}'", path.display()))?;
        let caps = dev.capabilities()?;
        let cap_flags = caps.device_capabilities();
        log::debug!(
            "{} ({}): {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            bail!(
                "'{}' ({}) is not a video capture device",
                path.display(),
                caps.card()
            );
        }

        let (pixfmt, fract) = negotiate_format(&dev, options.frame)
            .with_context(|| format!("unsupported video device '{}'", path.display()))?;

        let capture = dev.video_capture(pixfmt)?;

        let format = capture.format();
        let resolution = Resolution::new(format.width(), format.height());

        let actual = capture.set_frame_interval(fract)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / actual.as_f32(),
        );

        let stream = capture.into_stream(2)?;

        Ok(Self {
            stream,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        })
    }
}

impl FrameSource for Webcam {
    /// Waits for the next frame and decodes it.
    ///
    /// Webcams occasionally deliver corrupt MJPEG data; such a frame is returned as an error.
    fn read(&mut self) -> anyhow::Result<Frame> {
        let dequeue_guard = self.t_dequeue.start();
        let t_decode = &self.t_decode;
        let data = self.stream.dequeue(|buf| {
            drop(dequeue_guard);
            Ok(t_decode.time(|| Image::decode_jpeg(&buf)))
        })?;
        let image = data.context("webcam frame decode error")?;
        Ok(Frame::new(image, ChannelOrder::Rgb))
    }

    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_dequeue, &self.t_decode]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(width: u32, height: u32, fps: u32) -> FrameFormat {
        FrameFormat {
            resolution: Resolution::new(width, height),
            frame_interval: Fract::new(1, fps),
        }
    }

    fn negotiate(prefs: FramePrefs) -> Option<(Resolution, u32)> {
        negotiate_format_step(&formats(), prefs).map(|f| (f.resolution, f.fps().round() as u32))
    }

    fn formats() -> Vec<FrameFormat> {
        vec![
            fmt(640, 480, 30),
            fmt(640, 480, 60),
            fmt(1280, 720, 30),
            fmt(1920, 1080, 15),
        ]
    }

    #[test]
    fn prefers_resolution() {
        let prefs = FramePrefs::default();
        assert_eq!(negotiate(prefs), Some((Resolution::new(1920, 1080), 15)));

        let prefs = FramePrefs {
            fps: Some(30),
            ..Default::default()
        };
        assert_eq!(negotiate(prefs), Some((Resolution::new(1280, 720), 30)));
    }

    #[test]
    fn prefers_framerate() {
        let prefs = FramePrefs {
            pref: ParamPreference::Framerate,
            ..Default::default()
        };
        assert_eq!(negotiate(prefs), Some((Resolution::new(640, 480), 60)));
    }

    #[test]
    fn unsatisfiable_prefs_are_relaxed() {
        let mut prefs = FramePrefs {
            resolution: Some(Resolution::RES_1080P),
            fps: Some(60),
            pref: ParamPreference::Resolution,
        };
        assert_eq!(negotiate(prefs), None);

        assert!(relax(&mut prefs));
        assert_eq!(prefs.fps, None);
        assert_eq!(prefs.resolution, Some(Resolution::RES_1080P));
        assert_eq!(negotiate(prefs), Some((Resolution::new(1920, 1080), 15)));

        assert!(relax(&mut prefs));
        assert!(!relax(&mut prefs));
    }

    #[test]
    fn device_path_from_index() {
        assert_eq!(
            WebcamOptions::default().device_path(),
            PathBuf::from("/dev/video0")
        );
        assert_eq!(
            WebcamOptions::default().index(2).device_path(),
            PathBuf::from("/dev/video2")
        );
    }
}
