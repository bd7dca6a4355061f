//! The per-frame capture, detect, annotate and display loop.

use std::{
    io::{self, Write},
    thread,
    time::Duration,
};

use anyhow::Context;

use crate::detector::HandDetector;
use crate::gui::DisplaySink;
use crate::landmark::PixelLandmark;
use crate::mapping::map_hand;
use crate::overlay::{self, OverlayStyle};
use crate::timer::{FpsCounter, FpsMeter, Timer};
use crate::video::FrameSource;

/// How a [`Session`] reacts to frames that cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of consecutive read failures that are tolerated. One more ends the session with an
    /// error.
    pub max_consecutive_failures: u32,
    /// Time to wait after a failed read before trying again.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 100,
            retry_delay: Duration::from_millis(10),
        }
    }
}

/// Which landmark coordinates [`Session::run`] prints for every processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Prints `id x y` for every landmark of every detected hand, one landmark per line.
    All,
    /// Prints `[id, x, y]` for the given landmark of the first detected hand.
    Landmark(usize),
    /// Prints nothing.
    Nothing,
}

impl Default for Report {
    /// Reports the tip of the thumb.
    fn default() -> Self {
        Self::Landmark(4)
    }
}

impl Report {
    /// Writes the lines for one processed frame to `out`.
    pub fn write<O: Write>(&self, summary: &FrameSummary, out: &mut O) -> io::Result<()> {
        match *self {
            Report::All => {
                for lm in summary.hands.iter().flatten() {
                    writeln!(out, "{} {} {}", lm.id, lm.x, lm.y)?;
                }
            }
            Report::Landmark(id) => {
                if let Some(lm) = summary.hands.first().and_then(|hand| hand.get(id)) {
                    writeln!(out, "[{}, {}, {}]", lm.id, lm.x, lm.y)?;
                }
            }
            Report::Nothing => {}
        }
        Ok(())
    }
}

/// Results of a processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    /// Pixel coordinates of the landmarks of every detected hand.
    pub hands: Vec<Vec<PixelLandmark>>,
    /// Frame rate measured between this frame and the previous one.
    pub fps: Option<f32>,
}

/// Outcome of [`Session::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// No frame could be read; nothing was detected or displayed.
    Skipped,
    /// A frame was processed and displayed.
    Processed(FrameSummary),
    /// The display sink asked to stop.
    Quit,
}

/// Owns everything the frame loop needs and runs it.
pub struct Session<S, D, W> {
    source: S,
    detector: D,
    sink: W,
    meter: FpsMeter,
    style: OverlayStyle,
    draw: bool,
    retry: RetryPolicy,
    report: Report,
    failures: u32,
    fps: FpsCounter,
    t_detect: Timer,
    t_draw: Timer,
    t_show: Timer,
}

impl<S: FrameSource, D: HandDetector, W: DisplaySink> Session<S, D, W> {
    pub fn new(source: S, detector: D, sink: W) -> Self {
        Self {
            source,
            detector,
            sink,
            meter: FpsMeter::new(),
            style: OverlayStyle::default(),
            draw: true,
            retry: RetryPolicy::default(),
            report: Report::default(),
            failures: 0,
            fps: FpsCounter::new("session"),
            t_detect: Timer::new("detect"),
            t_draw: Timer::new("draw"),
            t_show: Timer::new("show"),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    /// Enables or disables drawing the landmark and frame rate overlay (enabled by default).
    pub fn with_overlay(mut self, draw: bool) -> Self {
        self.draw = draw;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_report(mut self, report: Report) -> Self {
        self.report = report;
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Returns the number of frame reads that failed in a row so far.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Consumes the session, returning the frame source, detector and display sink.
    pub fn into_parts(self) -> (S, D, W) {
        (self.source, self.detector, self.sink)
    }

    /// Reads, processes and displays a single frame.
    ///
    /// A failed read skips the rest of the iteration and returns [`Step::Skipped`], unless more
    /// than [`RetryPolicy::max_consecutive_failures`] reads have failed in a row, in which case
    /// the read error is returned.
    pub fn step(&mut self) -> anyhow::Result<Step> {
        let mut frame = match self.source.read() {
            Ok(frame) => {
                self.failures = 0;
                frame
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures > self.retry.max_consecutive_failures {
                    return Err(e.context(format!(
                        "giving up after {} consecutive frame read failures",
                        self.failures
                    )));
                }
                log::warn!(
                    "failed to read frame ({}/{}): {:#}",
                    self.failures,
                    self.retry.max_consecutive_failures,
                    e,
                );
                if !self.retry.retry_delay.is_zero() {
                    thread::sleep(self.retry.retry_delay);
                }
                return Ok(Step::Skipped);
            }
        };

        let hands = {
            let input = frame.to_order(self.detector.channel_order());
            self.t_detect
                .time(|| self.detector.detect(&input))
                .context("hand detection failed")?
        };
        log::trace!("detected {} hand(s)", hands.len());

        let res = frame.resolution();
        let mapped = hands.iter().map(|hand| map_hand(hand, res)).collect();
        let fps = self.meter.tick();

        if self.draw {
            let _guard = self.t_draw.start();
            for hand in &hands {
                overlay::draw_hand(&mut frame, hand, &self.style);
            }
            overlay::draw_fps(&mut frame, fps, &self.style);
        }

        self.t_show.time(|| self.sink.show(&frame))?;
        let stages = [&self.t_detect, &self.t_draw, &self.t_show];
        let timers = stages
            .into_iter()
            .chain(self.source.timers())
            .chain(self.detector.timers());
        self.fps.tick_with(timers);

        if self.sink.should_close() {
            return Ok(Step::Quit);
        }
        Ok(Step::Processed(FrameSummary { hands: mapped, fps }))
    }

    /// Runs the loop until the display sink asks to stop, printing landmark coordinates to
    /// *stdout* as configured by [`Report`].
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.run_with_output(&mut io::stdout().lock())
    }

    /// Like [`Session::run`], but writes the landmark report to `out`.
    pub fn run_with_output<O: Write>(&mut self, out: &mut O) -> anyhow::Result<()> {
        loop {
            match self.step()? {
                Step::Skipped => {}
                Step::Processed(summary) => {
                    self.report
                        .write(&summary, out)
                        .context("failed to write landmark report")?;
                }
                Step::Quit => {
                    log::info!("display closed, stopping");
                    return Ok(());
                }
            }
        }
    }
}
